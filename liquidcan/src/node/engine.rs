use heapless::{Deque, String, Vec};
use liquidcan_core::{
    DataType, FieldId, FieldKind, GroupId, LockState, ParameterSetStatus, ProcessId, StatusLevel,
    TypedValue,
};
use liquidcan_driver::time::Instant;
use liquidcan_driver::transport::Transport;

use crate::message::payloads::MAX_GROUP_VALUE_LENGTH;
use crate::message::{
    FieldGet, FieldGetResponse, FieldIdLookup, FieldIdLookupResponse, FieldRegistration,
    GroupDefinition, GroupUpdate, Heartbeat, LockConfirmation, LockRequest, Message, MessageKind,
    NodeInfo, Overflow, ParameterSet, ParameterSetConfirmation, StatusText,
};
use crate::process::{ProcessError, ProcessFailure, ProcessStatus, ProcessTable};
use crate::registry::{Field, FieldRegistry, RegistryError, MAX_GROUP_COUNT};

use super::config::NodeConfig;
use super::events::{NodeEvent, PeerInfo, MAX_PENDING_EVENT_COUNT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NodeError<E> {
    /// The operation needs [`Node::initialize`] to have run.
    NotInitialized,
    /// [`Node::initialize`] already ran.
    AlreadyInitialized,
    /// A name or text does not fit its wire region.
    InvalidLength,
    /// The field has no cached value yet.
    ValueUnset,
    Registry(RegistryError),
    Process(ProcessError),
    /// The transport refused the frame.
    Transport(E),
}

impl<E> From<RegistryError> for NodeError<E> {
    fn from(error: RegistryError) -> Self {
        Self::Registry(error)
    }
}

impl<E> From<ProcessError> for NodeError<E> {
    fn from(error: ProcessError) -> Self {
        Self::Process(error)
    }
}

impl<E> From<Overflow> for NodeError<E> {
    fn from(_: Overflow) -> Self {
        Self::InvalidLength
    }
}

/// Protocol engine for one end of a link
///
/// `FN` bounds the field table, `PN` the number of requests in flight. The engine owns
/// the transport and is driven entirely by the host: requests go out when their facade
/// method is called, everything inbound is handled inside [`Node::poll`]. Time only
/// enters through the `now` arguments, so the engine runs the same under a mock clock
/// as on hardware.
///
/// Confirmed requests return a [`ProcessId`] immediately; the host later checks
/// [`Node::is_ready`] or [`Node::is_failed`] and harvests with [`Node::take_result`] or
/// [`Node::take_failure`]. Peer-initiated traffic the engine answers by itself and
/// reports through [`Node::poll_event`].
pub struct Node<T: Transport, const FN: usize, const PN: usize> {
    config: NodeConfig,
    transport: T,
    registry: FieldRegistry<FN>,
    processes: ProcessTable<PN>,
    peer_groups: Vec<GroupDefinition, MAX_GROUP_COUNT>,
    events: Deque<NodeEvent, MAX_PENDING_EVENT_COUNT>,
    heartbeat_counter: u32,
    pending_heartbeat: Option<u32>,
    initialized: bool,
}

impl<T: Transport, const FN: usize, const PN: usize> Node<T, FN, PN> {
    pub fn new(config: NodeConfig, transport: T) -> Self {
        Self {
            transport,
            registry: FieldRegistry::new(),
            processes: ProcessTable::new(config.reclaim_timeout),
            peer_groups: Vec::new(),
            events: Deque::new(),
            heartbeat_counter: 0,
            pending_heartbeat: None,
            initialized: false,
            config,
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn registry(&self) -> &FieldRegistry<FN> {
        &self.registry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Registers a local telemetry field. Only valid before [`Node::initialize`].
    pub fn register_telemetry(
        &mut self,
        name: &str,
        data_type: DataType,
    ) -> Result<FieldId, NodeError<T::Error>> {
        self.register(name, data_type, FieldKind::Telemetry)
    }

    /// Registers a local parameter. Only valid before [`Node::initialize`].
    pub fn register_parameter(
        &mut self,
        name: &str,
        data_type: DataType,
    ) -> Result<FieldId, NodeError<T::Error>> {
        self.register(name, data_type, FieldKind::Parameter)
    }

    fn register(
        &mut self,
        name: &str,
        data_type: DataType,
        kind: FieldKind,
    ) -> Result<FieldId, NodeError<T::Error>> {
        if self.initialized {
            return Err(NodeError::AlreadyInitialized);
        }
        Ok(self.registry.register(name, data_type, kind)?)
    }

    /// Announces this node and every registered field to the peer.
    ///
    /// The whole field table must be registered first; afterwards every request facade
    /// method becomes usable and registration is refused.
    pub fn initialize(&mut self) -> Result<(), NodeError<T::Error>> {
        if self.initialized {
            return Err(NodeError::AlreadyInitialized);
        }
        let info = self.node_info()?;
        self.send(&Message::NodeInfoAnnouncement(info))?;
        for index in 0..self.registry.fields().len() {
            let message = {
                let field = &self.registry.fields()[index];
                let registration = unwrap!(FieldRegistration::new(
                    field.id(),
                    field.data_type(),
                    field.name()
                ));
                match field.kind() {
                    FieldKind::Telemetry => Message::TelemetryValueRegistration(registration),
                    FieldKind::Parameter => Message::ParameterRegistration(registration),
                }
            };
            self.send(&message)?;
        }
        self.initialized = true;
        info!("node up, {} fields announced", self.registry.fields().len());
        Ok(())
    }

    /// Feeds a locally produced value into the cache. Nothing is sent; the value
    /// travels with the next group update covering the field, or on request.
    pub fn update_telemetry(
        &mut self,
        id: FieldId,
        value: TypedValue,
    ) -> Result<(), NodeError<T::Error>> {
        Ok(self.registry.set_value(id, value)?)
    }

    /// Defines a telemetry group and announces it to the peer.
    ///
    /// The group stays defined even when the announcement frame is refused; the error
    /// only reports the loss.
    pub fn define_telemetry_group(
        &mut self,
        member_ids: &[FieldId],
    ) -> Result<GroupId, NodeError<T::Error>> {
        self.ensure_initialized()?;
        let id = self.registry.define_group(member_ids)?;
        let definition = unwrap!(GroupDefinition::new(id, member_ids));
        self.send(&Message::TelemetryGroupDefinition(definition))?;
        Ok(id)
    }

    /// Packs the cached values of every group member, in order, into one update.
    ///
    /// Fails with [`NodeError::ValueUnset`] when any member was never fed a value.
    pub fn publish_group_update(&mut self, id: GroupId) -> Result<(), NodeError<T::Error>> {
        self.ensure_initialized()?;
        let mut values = Vec::<u8, MAX_GROUP_VALUE_LENGTH>::new();
        {
            let group = self
                .registry
                .group(id)
                .ok_or(NodeError::Registry(RegistryError::UnknownId))?;
            for &member in group.member_ids() {
                let value = self.registry.value(member).ok_or(NodeError::ValueUnset)?;
                let mut scratch = [0u8; TypedValue::MAX_WIDTH];
                let width = value.write_le(&mut scratch);
                unwrap!(values.extend_from_slice(&scratch[..width]));
            }
        }
        let update = GroupUpdate {
            group_id: id,
            values,
        };
        self.send(&Message::TelemetryGroupUpdate(update))
    }

    /// Asks the peer to write a parameter; the outcome settles asynchronously.
    ///
    /// The local cache is only updated when the confirmation arrives, so a rejected or
    /// lost request leaves the old value visible.
    pub fn set_parameter(
        &mut self,
        id: FieldId,
        value: TypedValue,
        now: Instant,
    ) -> Result<ProcessId, NodeError<T::Error>> {
        self.ensure_initialized()?;
        let data_type = self.parameter_type(id)?;
        if value.data_type() != data_type {
            return Err(NodeError::Registry(RegistryError::TypeMismatch));
        }
        let process = self.processes.begin(
            MessageKind::ParameterSetRequest,
            MessageKind::ParameterSetConfirmation,
            Some(id),
            now + self.config.response_timeout,
        )?;
        let mut scratch = [0u8; TypedValue::MAX_WIDTH];
        let width = value.write_le(&mut scratch);
        let request = unwrap!(ParameterSet::new(id, &scratch[..width]));
        Ok(self.start_request(process, &Message::ParameterSetRequest(request)))
    }

    /// Asks the peer for its cached value of a field; any registered id is accepted.
    pub fn get_parameter(
        &mut self,
        id: FieldId,
        now: Instant,
    ) -> Result<ProcessId, NodeError<T::Error>> {
        self.ensure_initialized()?;
        if self.registry.field(id).is_none() {
            return Err(NodeError::Registry(RegistryError::UnknownId));
        }
        let process = self.processes.begin(
            MessageKind::FieldGetRequest,
            MessageKind::FieldGetResponse,
            Some(id),
            now + self.config.response_timeout,
        )?;
        let request = FieldGet { field_id: id };
        Ok(self.start_request(process, &Message::FieldGetRequest(request)))
    }

    /// Asks the peer to lock a parameter against further set requests.
    pub fn lock_parameter(
        &mut self,
        id: FieldId,
        now: Instant,
    ) -> Result<ProcessId, NodeError<T::Error>> {
        self.request_lock(id, LockState::Locked, now)
    }

    pub fn unlock_parameter(
        &mut self,
        id: FieldId,
        now: Instant,
    ) -> Result<ProcessId, NodeError<T::Error>> {
        self.request_lock(id, LockState::Unlocked, now)
    }

    fn request_lock(
        &mut self,
        id: FieldId,
        state: LockState,
        now: Instant,
    ) -> Result<ProcessId, NodeError<T::Error>> {
        self.ensure_initialized()?;
        self.parameter_type(id)?;
        let process = self.processes.begin(
            MessageKind::ParameterSetLockRequest,
            MessageKind::ParameterSetLockConfirmation,
            Some(id),
            now + self.config.response_timeout,
        )?;
        let request = LockRequest {
            parameter_id: id,
            lock_state: state,
        };
        Ok(self.start_request(process, &Message::ParameterSetLockRequest(request)))
    }

    /// Resolves a field name to its id at the peer. The result value carries the id
    /// as [`TypedValue::Uint8`].
    pub fn lookup_field_id(
        &mut self,
        name: &str,
        now: Instant,
    ) -> Result<ProcessId, NodeError<T::Error>> {
        self.ensure_initialized()?;
        let request = FieldIdLookup::new(name)?;
        let process = self.processes.begin(
            MessageKind::FieldIdLookupRequest,
            MessageKind::FieldIdLookupResponse,
            None,
            now + self.config.response_timeout,
        )?;
        Ok(self.start_request(process, &Message::FieldIdLookupRequest(request)))
    }

    /// Probes peer liveness. The result value echoes the counter as
    /// [`TypedValue::Uint32`]; an echo that does not match fails the process.
    pub fn send_heartbeat(&mut self, now: Instant) -> Result<ProcessId, NodeError<T::Error>> {
        self.ensure_initialized()?;
        let process = self.processes.begin(
            MessageKind::HeartbeatRequest,
            MessageKind::HeartbeatResponse,
            None,
            now + self.config.response_timeout,
        )?;
        let counter = self.heartbeat_counter;
        self.heartbeat_counter = self.heartbeat_counter.wrapping_add(1);
        self.pending_heartbeat = Some(counter);
        Ok(self.start_request(process, &Message::HeartbeatRequest(Heartbeat { counter })))
    }

    /// Fire and forget diagnostics; no process is opened and no reply comes back.
    /// Usable at any time, even before [`Node::initialize`].
    pub fn send_status(
        &mut self,
        level: StatusLevel,
        text: &str,
    ) -> Result<(), NodeError<T::Error>> {
        let status = StatusText::new(text)?;
        let message = match level {
            StatusLevel::Info => Message::InfoStatus(status),
            StatusLevel::Warning => Message::WarningStatus(status),
            StatusLevel::Error => Message::ErrorStatus(status),
        };
        self.send(&message)
    }

    pub fn process_status(&self, process: ProcessId) -> Option<ProcessStatus> {
        self.processes.status(process)
    }

    pub fn is_active(&self, process: ProcessId) -> bool {
        self.processes.is_active(process)
    }

    pub fn is_ready(&self, process: ProcessId) -> bool {
        self.processes.is_ready(process)
    }

    pub fn is_failed(&self, process: ProcessId) -> bool {
        self.processes.is_failed(process)
    }

    pub fn take_result(&mut self, process: ProcessId) -> Option<TypedValue> {
        self.processes.take_result(process)
    }

    pub fn take_failure(&mut self, process: ProcessId) -> Option<ProcessFailure> {
        self.processes.take_failure(process)
    }

    /// Abandons a live process; its slot frees once the failure is harvested.
    pub fn cancel(&mut self, process: ProcessId, now: Instant) -> Result<(), NodeError<T::Error>> {
        Ok(self.processes.fail(process, ProcessFailure::Cancelled, now)?)
    }

    /// Drains the transport, answers peer requests, settles processes, applies
    /// deadlines. Call this from the bus task, frequently enough to meet the
    /// response timeout.
    ///
    /// A reply frame the transport refuses is reported (last error wins) but never
    /// stops the drain; the corresponding peer request simply goes unanswered.
    pub fn poll(&mut self, now: Instant) -> Result<(), NodeError<T::Error>> {
        self.ensure_initialized()?;
        let mut outcome = Ok(());
        while let Some(payload) = self.transport.receive() {
            match Message::decode(&payload) {
                Ok(message) => {
                    trace!("received {:?}", message.kind());
                    if let Err(error) = self.dispatch(message, now) {
                        outcome = Err(error);
                    }
                }
                Err(error) => warn!("dropping undecodable frame: {:?}", error),
            }
        }
        self.processes.tick(now);
        outcome
    }

    /// Pops the oldest buffered peer-activity event.
    pub fn poll_event(&mut self) -> Option<NodeEvent> {
        self.events.pop_front()
    }

    fn ensure_initialized(&self) -> Result<(), NodeError<T::Error>> {
        if self.initialized {
            Ok(())
        } else {
            Err(NodeError::NotInitialized)
        }
    }

    fn parameter_type(&self, id: FieldId) -> Result<DataType, NodeError<T::Error>> {
        let field = self
            .registry
            .field(id)
            .ok_or(NodeError::Registry(RegistryError::UnknownId))?;
        if field.kind() != FieldKind::Parameter {
            return Err(NodeError::Registry(RegistryError::NotAParameter));
        }
        Ok(field.data_type())
    }

    fn node_info(&self) -> Result<NodeInfo, NodeError<T::Error>> {
        Ok(NodeInfo::new(
            self.registry.telemetry_count(),
            self.registry.parameter_count(),
            self.config.firmware_hash,
            self.config.protocol_hash,
            self.config.device_name,
        )?)
    }

    fn send(&mut self, message: &Message) -> Result<(), NodeError<T::Error>> {
        let payload = message.encode();
        trace!("sending {:?}", message.kind());
        self.transport.send(&payload).map_err(NodeError::Transport)
    }

    // A lost request is indistinguishable from one lost on the wire, so the process is
    // started either way and left to settle by timeout.
    fn start_request(&mut self, process: ProcessId, message: &Message) -> ProcessId {
        let outcome = self.send(message);
        unwrap!(self.processes.mark_started(process));
        if outcome.is_err() {
            warn!("request {:?} lost in transport", message.kind());
        }
        process
    }

    fn push_event(&mut self, event: NodeEvent) {
        if self.events.is_full() {
            warn!("event queue full, dropping the oldest event");
            self.events.pop_front();
        }
        unwrap!(self.events.push_back(event).ok());
    }

    fn dispatch(&mut self, message: Message, now: Instant) -> Result<(), NodeError<T::Error>> {
        match message {
            Message::NodeInfoRequest(info) => {
                self.note_peer_info(&info);
                let our_info = self.node_info()?;
                self.send(&Message::NodeInfoAnnouncement(our_info))
            }
            Message::NodeInfoAnnouncement(info) => {
                self.note_peer_info(&info);
                Ok(())
            }
            Message::InfoStatus(status) => {
                self.note_status(StatusLevel::Info, &status);
                Ok(())
            }
            Message::WarningStatus(status) => {
                self.note_status(StatusLevel::Warning, &status);
                Ok(())
            }
            Message::ErrorStatus(status) => {
                self.note_status(StatusLevel::Error, &status);
                Ok(())
            }
            Message::TelemetryValueRegistration(registration) => {
                self.note_registration(FieldKind::Telemetry, &registration);
                Ok(())
            }
            Message::ParameterRegistration(registration) => {
                self.note_registration(FieldKind::Parameter, &registration);
                Ok(())
            }
            Message::TelemetryGroupDefinition(definition) => {
                self.note_group_definition(definition);
                Ok(())
            }
            Message::TelemetryGroupUpdate(update) => {
                self.note_group_update(update);
                Ok(())
            }
            Message::HeartbeatRequest(heartbeat) => {
                self.push_event(NodeEvent::HeartbeatRequested {
                    counter: heartbeat.counter,
                });
                self.send(&Message::HeartbeatResponse(heartbeat))
            }
            Message::HeartbeatResponse(heartbeat) => {
                self.settle_heartbeat(heartbeat, now);
                Ok(())
            }
            Message::ParameterSetRequest(request) => {
                let confirmation = self.arbitrate_set(&request);
                self.send(&Message::ParameterSetConfirmation(confirmation))
            }
            Message::ParameterSetConfirmation(confirmation) => {
                self.settle_set(confirmation, now);
                Ok(())
            }
            Message::ParameterSetLockRequest(request) => {
                let confirmation = self.arbitrate_lock(&request);
                self.send(&Message::ParameterSetLockConfirmation(confirmation))
            }
            Message::ParameterSetLockConfirmation(confirmation) => {
                self.settle_lock(confirmation, now);
                Ok(())
            }
            Message::FieldGetRequest(request) => self.answer_get(request),
            Message::FieldGetResponse(response) => {
                self.settle_get(response, now);
                Ok(())
            }
            Message::FieldIdLookupRequest(request) => self.answer_lookup(&request),
            Message::FieldIdLookupResponse(response) => {
                self.settle_lookup(response, now);
                Ok(())
            }
        }
    }

    fn note_peer_info(&mut self, info: &NodeInfo) {
        if info.protocol_hash != self.config.protocol_hash {
            warn!(
                "peer protocol hash {} does not match ours {}",
                info.protocol_hash, self.config.protocol_hash
            );
        }
        let Ok(device_name) = core::str::from_utf8(&info.device_name) else {
            warn!("peer info carries a non-utf8 name, dropping");
            return;
        };
        let device_name = unwrap!(String::try_from(device_name));
        self.push_event(NodeEvent::PeerInfo(PeerInfo {
            device_name,
            telemetry_count: info.telemetry_count,
            parameter_count: info.parameter_count,
            firmware_hash: info.firmware_hash,
            protocol_hash: info.protocol_hash,
        }));
    }

    fn note_status(&mut self, level: StatusLevel, status: &StatusText) {
        let Ok(text) = core::str::from_utf8(&status.text) else {
            warn!("peer status with non-utf8 text, dropping");
            return;
        };
        debug!("peer status ({:?})", level);
        let text = unwrap!(String::try_from(text));
        self.push_event(NodeEvent::StatusReceived { level, text });
    }

    fn note_registration(&mut self, kind: FieldKind, registration: &FieldRegistration) {
        let Ok(name) = core::str::from_utf8(&registration.field_name) else {
            warn!("peer registration with non-utf8 name, dropping");
            return;
        };
        match self.registry.field(registration.field_id) {
            None => warn!(
                "peer announced field {:?} missing from the local table",
                registration.field_id
            ),
            Some(field) => {
                if field.data_type() != registration.data_type
                    || field.kind() != kind
                    || field.name() != name
                {
                    warn!(
                        "peer announcement for field {:?} disagrees with the local table",
                        registration.field_id
                    );
                }
            }
        }
        let name = unwrap!(String::try_from(name));
        self.push_event(NodeEvent::PeerFieldAnnounced {
            field_id: registration.field_id,
            data_type: registration.data_type,
            kind,
            name,
        });
    }

    fn note_group_definition(&mut self, definition: GroupDefinition) {
        self.push_event(NodeEvent::PeerGroupDefined {
            group_id: definition.group_id,
            member_ids: definition.member_ids.clone(),
        });
        if let Some(known) = self
            .peer_groups
            .iter_mut()
            .find(|known| known.group_id == definition.group_id)
        {
            *known = definition;
        } else if self.peer_groups.push(definition).is_err() {
            warn!("peer group table full, updates for this group will not be ingested");
        }
    }

    fn note_group_update(&mut self, update: GroupUpdate) {
        self.ingest_group_update(&update);
        self.push_event(NodeEvent::GroupUpdateReceived {
            group_id: update.group_id,
            values: update.values,
        });
    }

    // Splits a group update along its known definition and feeds the value cache.
    // Failures leave the cache partially updated but never corrupt; the raw event still
    // reaches the host.
    fn ingest_group_update(&mut self, update: &GroupUpdate) {
        let Some(definition) = self
            .peer_groups
            .iter()
            .find(|definition| definition.group_id == update.group_id)
        else {
            debug!("update for undefined group {:?}", update.group_id);
            return;
        };
        let mut offset = 0;
        for &member in &definition.member_ids {
            let Some(data_type) = self.registry.field(member).map(Field::data_type) else {
                warn!("group member {:?} missing from the local table", member);
                return;
            };
            let width = data_type.width();
            let Some(bytes) = update.values.get(offset..offset + width) else {
                warn!("group update shorter than its definition");
                return;
            };
            match TypedValue::read_le(data_type, bytes) {
                Ok(value) => unwrap!(self.registry.set_value(member, value)),
                Err(_) => {
                    warn!("unreadable value for group member {:?}", member);
                    return;
                }
            }
            offset += width;
        }
        if offset != update.values.len() {
            warn!("group update longer than its definition");
        }
    }

    fn settle_heartbeat(&mut self, heartbeat: Heartbeat, now: Instant) {
        let Some(process) = self.processes.resolve(MessageKind::HeartbeatResponse, None) else {
            warn!("unsolicited heartbeat response");
            return;
        };
        if self.pending_heartbeat == Some(heartbeat.counter) {
            self.pending_heartbeat = None;
            unwrap!(self.processes.complete(process, TypedValue::Uint32(heartbeat.counter), now));
        } else {
            warn!("heartbeat echo mismatch");
            unwrap!(self.processes.fail(process, ProcessFailure::MalformedResponse, now));
        }
    }

    // Responder side of a set request. Locked parameters refuse every bus write; the
    // peer that placed the lock releases it before setting.
    fn arbitrate_set(&mut self, request: &ParameterSet) -> ParameterSetConfirmation {
        let id = request.parameter_id;
        let reject = |status| unwrap!(ParameterSetConfirmation::new(id, status, &[]));
        let Some((kind, data_type, locked)) = self
            .registry
            .field(id)
            .map(|field| (field.kind(), field.data_type(), field.is_locked()))
        else {
            debug!("set request for unknown field {:?}", id);
            return reject(ParameterSetStatus::InvalidParameterId);
        };
        if kind != FieldKind::Parameter {
            return reject(ParameterSetStatus::InvalidParameterId);
        }
        if locked {
            debug!("set request for locked parameter {:?}", id);
            return reject(ParameterSetStatus::ParameterLocked);
        }
        let Ok(value) = TypedValue::read_le(data_type, &request.value) else {
            warn!("set request value for {:?} does not decode as {:?}", id, data_type);
            return reject(ParameterSetStatus::InvalidParameterId);
        };
        unwrap!(self.registry.set_value(id, value));
        self.push_event(NodeEvent::ParameterSetRemotely {
            parameter_id: id,
            value,
        });
        unwrap!(ParameterSetConfirmation::new(
            id,
            ParameterSetStatus::Success,
            &request.value
        ))
    }

    fn settle_set(&mut self, confirmation: ParameterSetConfirmation, now: Instant) {
        let id = confirmation.parameter_id;
        match self.processes.resolve(MessageKind::ParameterSetConfirmation, Some(id)) {
            Some(process) => match confirmation.status {
                ParameterSetStatus::Success => match self.decode_for(id, &confirmation.value) {
                    Some(value) => {
                        unwrap!(self.registry.set_value(id, value));
                        unwrap!(self.processes.complete(process, value, now));
                    }
                    None => {
                        unwrap!(self.processes.fail(process, ProcessFailure::MalformedResponse, now));
                    }
                },
                status => {
                    debug!("set request for {:?} rejected: {:?}", id, status);
                    unwrap!(self.processes.fail(process, ProcessFailure::Rejected(status), now));
                }
            },
            // No process expects this: the peer reports a write this node did not
            // issue. Apply it so the cache tracks the bus.
            None => match confirmation.status {
                ParameterSetStatus::Success | ParameterSetStatus::NodeToNodeModification => {
                    if let Some(value) = self.decode_for(id, &confirmation.value) {
                        unwrap!(self.registry.set_value(id, value));
                        self.push_event(NodeEvent::ParameterSetRemotely {
                            parameter_id: id,
                            value,
                        });
                    }
                }
                status => warn!("unsolicited set confirmation for {:?} with {:?}", id, status),
            },
        }
    }

    fn arbitrate_lock(&mut self, request: &LockRequest) -> LockConfirmation {
        let status = match self
            .registry
            .set_lock(request.parameter_id, request.lock_state)
        {
            Ok(()) => {
                self.push_event(NodeEvent::ParameterLockChanged {
                    parameter_id: request.parameter_id,
                    lock_state: request.lock_state,
                });
                ParameterSetStatus::Success
            }
            Err(error) => {
                debug!(
                    "lock request for {:?} refused: {:?}",
                    request.parameter_id, error
                );
                ParameterSetStatus::InvalidParameterId
            }
        };
        LockConfirmation {
            parameter_id: request.parameter_id,
            lock_state: request.lock_state,
            status,
        }
    }

    fn settle_lock(&mut self, confirmation: LockConfirmation, now: Instant) {
        let id = confirmation.parameter_id;
        match self
            .processes
            .resolve(MessageKind::ParameterSetLockConfirmation, Some(id))
        {
            Some(process) => match confirmation.status {
                ParameterSetStatus::Success => {
                    unwrap!(self.registry.set_lock(id, confirmation.lock_state));
                    unwrap!(self.processes.complete(
                        process,
                        TypedValue::Boolean(confirmation.lock_state.is_locked()),
                        now
                    ));
                }
                status => {
                    debug!("lock request for {:?} rejected: {:?}", id, status);
                    unwrap!(self.processes.fail(process, ProcessFailure::Rejected(status), now));
                }
            },
            None => {
                if confirmation.status == ParameterSetStatus::Success {
                    match self.registry.set_lock(id, confirmation.lock_state) {
                        Ok(()) => self.push_event(NodeEvent::ParameterLockChanged {
                            parameter_id: id,
                            lock_state: confirmation.lock_state,
                        }),
                        Err(error) => {
                            warn!("unsolicited lock confirmation for {:?} refused: {:?}", id, error);
                        }
                    }
                } else {
                    warn!(
                        "unsolicited lock confirmation for {:?} with {:?}",
                        id, confirmation.status
                    );
                }
            }
        }
    }

    fn answer_get(&mut self, request: FieldGet) -> Result<(), NodeError<T::Error>> {
        let Some(value) = self.registry.value(request.field_id) else {
            // No kind exists for a negative reply; the requester settles by timeout.
            debug!("get request for {:?} but no value is cached", request.field_id);
            return Ok(());
        };
        let mut scratch = [0u8; TypedValue::MAX_WIDTH];
        let width = value.write_le(&mut scratch);
        let response = unwrap!(FieldGetResponse::new(request.field_id, &scratch[..width]));
        self.send(&Message::FieldGetResponse(response))
    }

    fn settle_get(&mut self, response: FieldGetResponse, now: Instant) {
        let id = response.field_id;
        let Some(process) = self.processes.resolve(MessageKind::FieldGetResponse, Some(id)) else {
            warn!("unsolicited get response for {:?}", id);
            return;
        };
        match self.decode_for(id, &response.value) {
            Some(value) => {
                unwrap!(self.registry.set_value(id, value));
                unwrap!(self.processes.complete(process, value, now));
            }
            None => unwrap!(self.processes.fail(process, ProcessFailure::MalformedResponse, now)),
        }
    }

    fn answer_lookup(&mut self, request: &FieldIdLookup) -> Result<(), NodeError<T::Error>> {
        let Ok(name) = core::str::from_utf8(&request.field_name) else {
            warn!("lookup request with non-utf8 name");
            return Ok(());
        };
        let Some((field_id, data_type)) = self
            .registry
            .field_by_name(name)
            .map(|field| (field.id(), field.data_type()))
        else {
            // Same as an uncached get: no reply, the requester times out.
            debug!("lookup request for an unknown name");
            return Ok(());
        };
        self.send(&Message::FieldIdLookupResponse(FieldIdLookupResponse {
            field_id,
            data_type,
        }))
    }

    fn settle_lookup(&mut self, response: FieldIdLookupResponse, now: Instant) {
        let Some(process) = self.processes.resolve(MessageKind::FieldIdLookupResponse, None) else {
            warn!("unsolicited lookup response");
            return;
        };
        if let Some(field) = self.registry.field(response.field_id) {
            if field.data_type() != response.data_type {
                warn!(
                    "lookup response for {:?} disagrees with the local table",
                    response.field_id
                );
            }
        }
        unwrap!(self.processes.complete(
            process,
            TypedValue::Uint8(response.field_id.into_u8()),
            now
        ));
    }

    // The peer decodes values against its own copy of the field table.
    fn decode_for(&self, id: FieldId, bytes: &[u8]) -> Option<TypedValue> {
        let Some(field) = self.registry.field(id) else {
            warn!("response for unknown field {:?}", id);
            return None;
        };
        match TypedValue::read_le(field.data_type(), bytes) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("value for {:?} does not decode as {:?}", id, field.data_type());
                None
            }
        }
    }
}
