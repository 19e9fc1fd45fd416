//! Request lifecycle tracking
//!
//! Every confirmed request occupies one process slot from the moment it is issued until
//! the host harvests its outcome, and the slot remembers which response kind (plus an
//! optional field id) will settle it. Responses are matched purely by that expectation;
//! nothing travels on the wire to correlate them. Duplicate expectations are therefore
//! rejected up front, which keeps every inbound response unambiguous.

use liquidcan_core::{FieldId, ParameterSetStatus, ProcessId, TypedValue};
use liquidcan_driver::time::{Duration, Instant};

use crate::message::MessageKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProcessStatus {
    /// Created, but its request has not been handed to the transport yet.
    New,
    /// The request left the node; a response may arrive.
    Started,
    /// The response arrived and the result awaits harvesting.
    Done,
    /// The process ended without a usable response.
    Failed,
}

/// Why a process ended in [`ProcessStatus::Failed`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProcessFailure {
    /// The peer answered with a non-success status.
    Rejected(ParameterSetStatus),
    /// A response arrived but its body was unusable.
    MalformedResponse,
    /// No response arrived before the deadline.
    TimedOut,
    /// The host abandoned the process.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProcessError {
    /// Every process slot is in use.
    NoProcessSlotLeft,
    /// A live process already awaits the same response.
    CorrelationOccupied,
    /// No slot carries this process id.
    UnknownId,
    /// The process is not in a status that allows this step.
    InvalidTransition,
}

/// One tracked request
#[derive(Debug, Clone, Copy)]
pub struct Process {
    id: ProcessId,
    request: MessageKind,
    expected_response: MessageKind,
    correlation_key: Option<FieldId>,
    status: ProcessStatus,
    deadline: Instant,
    result: Option<TypedValue>,
    failure: Option<ProcessFailure>,
}

impl Process {
    pub const fn id(&self) -> ProcessId {
        self.id
    }

    pub const fn request(&self) -> MessageKind {
        self.request
    }

    pub const fn expected_response(&self) -> MessageKind {
        self.expected_response
    }

    pub const fn correlation_key(&self) -> Option<FieldId> {
        self.correlation_key
    }

    pub const fn status(&self) -> ProcessStatus {
        self.status
    }

    /// Response deadline while live, reclaim deadline once settled.
    pub const fn deadline(&self) -> Instant {
        self.deadline
    }
}

pub struct ProcessTable<const N: usize> {
    slots: [Option<Process>; N],
    next_id: ProcessId,
    reclaim_timeout: Duration,
}

impl<const N: usize> ProcessTable<N> {
    // Process ids are single bytes; allocation needs a spare id beyond the live ones.
    const _ASSERT_MAX_N: usize = u8::MAX as usize - N;

    /// `reclaim_timeout` bounds how long a settled process may sit unharvested.
    pub const fn new(reclaim_timeout: Duration) -> Self {
        Self {
            slots: [None; N],
            next_id: ProcessId::FIRST,
            reclaim_timeout,
        }
    }

    /// Opens a process in [`ProcessStatus::New`].
    ///
    /// Fails with [`ProcessError::CorrelationOccupied`] when a live process already
    /// expects the same response kind under the same key; a response arriving for that
    /// pair would be impossible to attribute.
    pub fn begin(
        &mut self,
        request: MessageKind,
        expected_response: MessageKind,
        correlation_key: Option<FieldId>,
        deadline: Instant,
    ) -> Result<ProcessId, ProcessError> {
        let occupied = self.slots.iter().flatten().any(|process| {
            matches!(process.status, ProcessStatus::New | ProcessStatus::Started)
                && process.expected_response == expected_response
                && process.correlation_key == correlation_key
        });
        if occupied {
            return Err(ProcessError::CorrelationOccupied);
        }
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(ProcessError::NoProcessSlotLeft)?;
        let id = self.allocate_id();
        self.slots[slot] = Some(Process {
            id,
            request,
            expected_response,
            correlation_key,
            status: ProcessStatus::New,
            deadline,
            result: None,
            failure: None,
        });
        Ok(id)
    }

    // Monotonic cursor over the u8 id space, stepping over ids still held by a slot.
    // Terminates because the slot count is below the id count.
    fn allocate_id(&mut self) -> ProcessId {
        let mut candidate = self.next_id;
        while self.find(candidate).is_some() {
            candidate = candidate.next();
        }
        self.next_id = candidate.next();
        candidate
    }

    fn find(&self, id: ProcessId) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| matches!(slot, Some(process) if process.id == id))
    }

    fn get_mut(&mut self, id: ProcessId) -> Option<&mut Process> {
        self.slots.iter_mut().flatten().find(|process| process.id == id)
    }

    pub fn get(&self, id: ProcessId) -> Option<&Process> {
        self.slots.iter().flatten().find(|process| process.id == id)
    }

    pub fn mark_started(&mut self, id: ProcessId) -> Result<(), ProcessError> {
        let process = self.get_mut(id).ok_or(ProcessError::UnknownId)?;
        if process.status != ProcessStatus::New {
            return Err(ProcessError::InvalidTransition);
        }
        process.status = ProcessStatus::Started;
        Ok(())
    }

    /// Finds the started process awaiting this response.
    ///
    /// At most one can match; [`Self::begin`] refuses duplicate expectations.
    pub fn resolve(
        &self,
        response: MessageKind,
        correlation_key: Option<FieldId>,
    ) -> Option<ProcessId> {
        self.slots
            .iter()
            .flatten()
            .find(|process| {
                process.status == ProcessStatus::Started
                    && process.expected_response == response
                    && process.correlation_key == correlation_key
            })
            .map(|process| process.id)
    }

    pub fn complete(
        &mut self,
        id: ProcessId,
        result: TypedValue,
        now: Instant,
    ) -> Result<(), ProcessError> {
        let reclaim_timeout = self.reclaim_timeout;
        let process = self.get_mut(id).ok_or(ProcessError::UnknownId)?;
        if process.status != ProcessStatus::Started {
            return Err(ProcessError::InvalidTransition);
        }
        process.status = ProcessStatus::Done;
        process.result = Some(result);
        process.deadline = now + reclaim_timeout;
        Ok(())
    }

    pub fn fail(
        &mut self,
        id: ProcessId,
        failure: ProcessFailure,
        now: Instant,
    ) -> Result<(), ProcessError> {
        let reclaim_timeout = self.reclaim_timeout;
        let process = self.get_mut(id).ok_or(ProcessError::UnknownId)?;
        if !matches!(process.status, ProcessStatus::New | ProcessStatus::Started) {
            return Err(ProcessError::InvalidTransition);
        }
        process.status = ProcessStatus::Failed;
        process.failure = Some(failure);
        process.deadline = now + reclaim_timeout;
        Ok(())
    }

    pub fn status(&self, id: ProcessId) -> Option<ProcessStatus> {
        self.get(id).map(Process::status)
    }

    pub fn is_active(&self, id: ProcessId) -> bool {
        matches!(
            self.status(id),
            Some(ProcessStatus::New | ProcessStatus::Started)
        )
    }

    pub fn is_ready(&self, id: ProcessId) -> bool {
        matches!(self.status(id), Some(ProcessStatus::Done))
    }

    pub fn is_failed(&self, id: ProcessId) -> bool {
        matches!(self.status(id), Some(ProcessStatus::Failed))
    }

    /// Harvests a [`ProcessStatus::Done`] process and frees its slot.
    ///
    /// Returns `None`, touching nothing, in every other status.
    pub fn take_result(&mut self, id: ProcessId) -> Option<TypedValue> {
        let slot = self.find(id)?;
        let process = self.slots[slot]?;
        if process.status != ProcessStatus::Done {
            return None;
        }
        self.slots[slot] = None;
        process.result
    }

    /// Harvests a [`ProcessStatus::Failed`] process and frees its slot.
    pub fn take_failure(&mut self, id: ProcessId) -> Option<ProcessFailure> {
        let slot = self.find(id)?;
        let process = self.slots[slot]?;
        if process.status != ProcessStatus::Failed {
            return None;
        }
        self.slots[slot] = None;
        process.failure
    }

    pub fn active_count(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|process| matches!(process.status, ProcessStatus::New | ProcessStatus::Started))
            .count()
    }

    /// Applies deadlines. Live processes past their deadline fail with
    /// [`ProcessFailure::TimedOut`]; settled ones past their reclaim deadline are
    /// dropped so an inattentive host cannot leak slots. Deadlines fire at
    /// `now >= deadline`.
    pub fn tick(&mut self, now: Instant) {
        let reclaim_timeout = self.reclaim_timeout;
        for slot in &mut self.slots {
            let Some(process) = slot else { continue };
            if now < process.deadline {
                continue;
            }
            match process.status {
                ProcessStatus::New | ProcessStatus::Started => {
                    warn!(
                        "process {:?} timed out awaiting {:?}",
                        process.id, process.expected_response
                    );
                    process.status = ProcessStatus::Failed;
                    process.failure = Some(ProcessFailure::TimedOut);
                    process.deadline = now + reclaim_timeout;
                }
                ProcessStatus::Done | ProcessStatus::Failed => {
                    let id = process.id;
                    *slot = None;
                    warn!("reclaiming unharvested process {:?}", id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    fn ts(millis: u64) -> Instant {
        Instant::from_millis(millis)
    }

    fn table() -> ProcessTable<4> {
        ProcessTable::new(Duration::from_secs(5))
    }

    #[test]
    fn test_lifecycle() {
        let mut table = table();
        let id = table
            .begin(
                MessageKind::ParameterSetRequest,
                MessageKind::ParameterSetConfirmation,
                Some(FieldId::new(3)),
                ts(250),
            )
            .unwrap();
        assert_eq!(table.status(id), Some(ProcessStatus::New));
        assert!(table.is_active(id));
        // Not resolvable until the request actually left.
        assert_eq!(
            table.resolve(MessageKind::ParameterSetConfirmation, Some(FieldId::new(3))),
            None
        );

        table.mark_started(id).unwrap();
        assert_eq!(
            table.resolve(MessageKind::ParameterSetConfirmation, Some(FieldId::new(3))),
            Some(id)
        );
        assert_eq!(
            table.resolve(MessageKind::ParameterSetConfirmation, Some(FieldId::new(4))),
            None
        );

        table.complete(id, TypedValue::Uint16(1500), ts(10)).unwrap();
        assert!(table.is_ready(id));
        assert!(!table.is_active(id));
        assert_eq!(table.take_failure(id), None);
        assert_eq!(table.take_result(id), Some(TypedValue::Uint16(1500)));
        // Harvesting freed the slot.
        assert_eq!(table.status(id), None);
        assert_eq!(table.take_result(id), None);
    }

    #[test]
    fn test_duplicate_expectation_is_rejected() {
        let mut table = table();
        let first = table
            .begin(
                MessageKind::ParameterSetRequest,
                MessageKind::ParameterSetConfirmation,
                Some(FieldId::new(3)),
                ts(250),
            )
            .unwrap();
        assert_eq!(
            table.begin(
                MessageKind::ParameterSetRequest,
                MessageKind::ParameterSetConfirmation,
                Some(FieldId::new(3)),
                ts(250),
            ),
            Err(ProcessError::CorrelationOccupied)
        );
        // A different key is a different expectation.
        table
            .begin(
                MessageKind::ParameterSetRequest,
                MessageKind::ParameterSetConfirmation,
                Some(FieldId::new(4)),
                ts(250),
            )
            .unwrap();

        // Settling and harvesting the first frees the expectation.
        table.mark_started(first).unwrap();
        table.complete(first, TypedValue::Uint16(1), ts(10)).unwrap();
        table.take_result(first).unwrap();
        table
            .begin(
                MessageKind::ParameterSetRequest,
                MessageKind::ParameterSetConfirmation,
                Some(FieldId::new(3)),
                ts(250),
            )
            .unwrap();
    }

    #[test]
    fn test_slots_are_finite() {
        let mut table: ProcessTable<1> = ProcessTable::new(Duration::from_secs(5));
        assert_eq!(table.active_count(), 0);
        table
            .begin(
                MessageKind::HeartbeatRequest,
                MessageKind::HeartbeatResponse,
                None,
                ts(250),
            )
            .unwrap();
        assert_eq!(table.active_count(), 1);
        assert_eq!(
            table.begin(
                MessageKind::FieldIdLookupRequest,
                MessageKind::FieldIdLookupResponse,
                None,
                ts(250),
            ),
            Err(ProcessError::NoProcessSlotLeft)
        );
    }

    #[test]
    fn test_failure_harvest() {
        let mut table = table();
        let id = table
            .begin(
                MessageKind::ParameterSetRequest,
                MessageKind::ParameterSetConfirmation,
                Some(FieldId::new(0)),
                ts(250),
            )
            .unwrap();
        table.mark_started(id).unwrap();
        table
            .fail(
                id,
                ProcessFailure::Rejected(ParameterSetStatus::ParameterLocked),
                ts(10),
            )
            .unwrap();
        assert!(table.is_failed(id));
        // Wrong harvest verb touches nothing.
        assert_eq!(table.take_result(id), None);
        assert!(table.is_failed(id));
        assert_eq!(
            table.take_failure(id),
            Some(ProcessFailure::Rejected(ParameterSetStatus::ParameterLocked))
        );
        assert_eq!(table.status(id), None);
    }

    #[test]
    fn test_settled_processes_reject_further_transitions() {
        let mut table = table();
        let id = table
            .begin(
                MessageKind::HeartbeatRequest,
                MessageKind::HeartbeatResponse,
                None,
                ts(250),
            )
            .unwrap();
        table.mark_started(id).unwrap();
        assert_eq!(
            table.mark_started(id),
            Err(ProcessError::InvalidTransition)
        );
        table.complete(id, TypedValue::Uint32(1), ts(10)).unwrap();
        assert_eq!(
            table.complete(id, TypedValue::Uint32(2), ts(11)),
            Err(ProcessError::InvalidTransition)
        );
        assert_eq!(
            table.fail(id, ProcessFailure::Cancelled, ts(11)),
            Err(ProcessError::InvalidTransition)
        );
    }

    #[test]
    fn test_timeout_fires_at_deadline() {
        let mut table = table();
        let id = table
            .begin(
                MessageKind::HeartbeatRequest,
                MessageKind::HeartbeatResponse,
                None,
                ts(100),
            )
            .unwrap();
        table.mark_started(id).unwrap();

        table.tick(ts(99));
        assert!(table.is_active(id));

        table.tick(ts(100));
        assert!(table.is_failed(id));
        assert_eq!(table.take_failure(id), Some(ProcessFailure::TimedOut));
    }

    #[test]
    fn test_unharvested_processes_are_reclaimed() {
        let mut table = table();
        let id = table
            .begin(
                MessageKind::HeartbeatRequest,
                MessageKind::HeartbeatResponse,
                None,
                ts(100),
            )
            .unwrap();
        table.mark_started(id).unwrap();
        table.complete(id, TypedValue::Uint32(9), ts(0)).unwrap();

        table.tick(ts(4_999));
        assert!(table.is_ready(id));

        // Reclaim timeout is five seconds past settling.
        table.tick(ts(5_000));
        assert_eq!(table.status(id), None);
    }

    #[test]
    fn test_id_allocation_skips_live_ids() {
        let mut table: ProcessTable<2> = ProcessTable::new(Duration::from_secs(5));
        let long_lived = table
            .begin(
                MessageKind::ParameterSetRequest,
                MessageKind::ParameterSetConfirmation,
                Some(FieldId::new(9)),
                ts(1_000_000),
            )
            .unwrap();
        assert_eq!(long_lived, ProcessId::new(0));

        // Drive the cursor through the entire u8 space; the wrap must step over the
        // still-live id 0.
        let mut last = ProcessId::new(0);
        for _ in 0..256 {
            let id = table
                .begin(
                    MessageKind::HeartbeatRequest,
                    MessageKind::HeartbeatResponse,
                    None,
                    ts(1_000_000),
                )
                .unwrap();
            table.mark_started(id).unwrap();
            table.complete(id, TypedValue::Uint32(0), ts(0)).unwrap();
            table.take_result(id).unwrap();
            last = id;
        }
        assert_eq!(last, ProcessId::new(1));
        assert!(table.is_active(long_lived));
    }
}
