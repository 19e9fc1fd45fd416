//! Field table shared by both ends of a link
//!
//! Both nodes compile against the same field vocabulary, so one registry describes the
//! whole link: ids are assigned in registration order and mean the same thing on either
//! side. The registry stores the declared type, the parameter lock flag, and the last
//! value seen for every field, whether that value was produced locally or learned from
//! the peer.

use heapless::{String, Vec};
use liquidcan_core::{DataType, FieldId, FieldKind, GroupId, LockState, TypedValue};

use crate::message::payloads::{MAX_FIELD_NAME_LENGTH, MAX_GROUP_VALUE_LENGTH};

/// Telemetry groups a node may define
pub const MAX_GROUP_COUNT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegistryError {
    /// The field name does not fit its wire region
    NameTooLong,
    /// Another field is already registered under this name
    NameOccupied,
    /// Every field slot is in use
    NoFieldSlotLeft,
    /// Every group slot is in use
    NoGroupSlotLeft,
    /// No field is registered under this id
    UnknownId,
    /// The field is not a parameter
    NotAParameter,
    /// Group members must be telemetry fields
    NotTelemetry,
    /// The value's type differs from the field's declared type
    TypeMismatch,
    /// The members' packed values exceed one group update
    GroupTooLarge,
}

/// One registered field
#[derive(Debug, Clone)]
pub struct Field {
    id: FieldId,
    name: String<MAX_FIELD_NAME_LENGTH>,
    data_type: DataType,
    kind: FieldKind,
    lock_state: LockState,
    value: Option<TypedValue>,
}

impl Field {
    pub const fn id(&self) -> FieldId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn data_type(&self) -> DataType {
        self.data_type
    }

    pub const fn kind(&self) -> FieldKind {
        self.kind
    }

    pub const fn lock_state(&self) -> LockState {
        self.lock_state
    }

    pub const fn is_locked(&self) -> bool {
        self.lock_state.is_locked()
    }

    /// Last value seen for this field, if any was ever set.
    pub const fn value(&self) -> Option<TypedValue> {
        self.value
    }
}

/// A defined telemetry group: an id and its member fields in packing order
#[derive(Debug, Clone)]
pub struct Group {
    id: GroupId,
    member_ids: Vec<FieldId, MAX_GROUP_VALUE_LENGTH>,
}

impl Group {
    pub const fn id(&self) -> GroupId {
        self.id
    }

    pub fn member_ids(&self) -> &[FieldId] {
        &self.member_ids
    }
}

pub struct FieldRegistry<const N: usize> {
    fields: Vec<Field, N>,
    groups: Vec<Group, MAX_GROUP_COUNT>,
}

impl<const N: usize> FieldRegistry<N> {
    // Ids and the per-kind counts in a node info body are single bytes.
    const _ASSERT_MAX_N: usize = FieldId::MAX.into_u8() as usize - N;

    pub const fn new() -> Self {
        Self {
            fields: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// Registers a field; the returned id is its index in registration order.
    ///
    /// Both ends must register the same fields in the same order for the ids to line up;
    /// the protocol hash exchanged in node info exists to catch drift.
    pub fn register(
        &mut self,
        name: &str,
        data_type: DataType,
        kind: FieldKind,
    ) -> Result<FieldId, RegistryError> {
        let name = String::try_from(name).map_err(|_| RegistryError::NameTooLong)?;
        if self.fields.iter().any(|field| field.name.as_str() == name.as_str()) {
            return Err(RegistryError::NameOccupied);
        }
        let id = FieldId::new(self.fields.len() as u8);
        self.fields
            .push(Field {
                id,
                name,
                data_type,
                kind,
                lock_state: LockState::Unlocked,
                value: None,
            })
            .map_err(|_| RegistryError::NoFieldSlotLeft)?;
        Ok(id)
    }

    pub fn field(&self, id: FieldId) -> Option<&Field> {
        self.fields.get(usize::from(id))
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name.as_str() == name)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn telemetry_count(&self) -> u8 {
        self.count_of(FieldKind::Telemetry)
    }

    pub fn parameter_count(&self) -> u8 {
        self.count_of(FieldKind::Parameter)
    }

    fn count_of(&self, kind: FieldKind) -> u8 {
        self.fields.iter().filter(|field| field.kind == kind).count() as u8
    }

    /// Caches a value for a field, no matter which side produced it.
    pub fn set_value(&mut self, id: FieldId, value: TypedValue) -> Result<(), RegistryError> {
        let field = self
            .fields
            .get_mut(usize::from(id))
            .ok_or(RegistryError::UnknownId)?;
        if value.data_type() != field.data_type {
            return Err(RegistryError::TypeMismatch);
        }
        field.value = Some(value);
        Ok(())
    }

    /// Last cached value, `None` for unknown ids and for fields never written.
    pub fn value(&self, id: FieldId) -> Option<TypedValue> {
        self.field(id).and_then(Field::value)
    }

    /// Applies a lock state; re-applying the current state is not an error.
    pub fn set_lock(&mut self, id: FieldId, state: LockState) -> Result<(), RegistryError> {
        let field = self
            .fields
            .get_mut(usize::from(id))
            .ok_or(RegistryError::UnknownId)?;
        if field.kind != FieldKind::Parameter {
            return Err(RegistryError::NotAParameter);
        }
        field.lock_state = state;
        Ok(())
    }

    /// Defines a telemetry group over the given members, in packing order.
    ///
    /// Every member must be a registered telemetry field and the members' packed widths
    /// must fit one update payload. A member count over the definition limit always
    /// trips the width check first, so it needs no rule of its own.
    pub fn define_group(&mut self, member_ids: &[FieldId]) -> Result<GroupId, RegistryError> {
        let mut packed_width = 0;
        for &member in member_ids {
            let field = self.field(member).ok_or(RegistryError::UnknownId)?;
            if field.kind != FieldKind::Telemetry {
                return Err(RegistryError::NotTelemetry);
            }
            packed_width += field.data_type.width();
        }
        if packed_width > MAX_GROUP_VALUE_LENGTH {
            return Err(RegistryError::GroupTooLarge);
        }
        if self.groups.is_full() {
            return Err(RegistryError::NoGroupSlotLeft);
        }
        let id = GroupId::new(self.groups.len() as u8);
        let member_ids = unwrap!(Vec::from_slice(member_ids));
        unwrap!(self.groups.push(Group { id, member_ids }).ok());
        Ok(id)
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(usize::from(id))
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }
}

impl<const N: usize> Default for FieldRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    fn populated() -> FieldRegistry<8> {
        let mut registry = FieldRegistry::new();
        registry
            .register("flow_rate", DataType::Float32, FieldKind::Telemetry)
            .unwrap();
        registry
            .register("pump_state", DataType::Uint8, FieldKind::Telemetry)
            .unwrap();
        registry
            .register("target_rpm", DataType::Uint16, FieldKind::Parameter)
            .unwrap();
        registry
    }

    #[test]
    fn test_ids_follow_registration_order() {
        let registry = populated();
        assert_eq!(registry.field(FieldId::new(0)).unwrap().name(), "flow_rate");
        assert_eq!(registry.field(FieldId::new(1)).unwrap().name(), "pump_state");
        assert_eq!(registry.field(FieldId::new(2)).unwrap().name(), "target_rpm");
        assert!(registry.field(FieldId::new(3)).is_none());
        assert_eq!(registry.telemetry_count(), 2);
        assert_eq!(registry.parameter_count(), 1);
    }

    #[test]
    fn test_lookup_by_name() {
        let registry = populated();
        let field = registry.field_by_name("target_rpm").unwrap();
        assert_eq!(field.id(), FieldId::new(2));
        assert_eq!(field.data_type(), DataType::Uint16);
        assert_eq!(field.kind(), FieldKind::Parameter);
        assert!(registry.field_by_name("no_such_field").is_none());
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let mut registry = populated();
        assert_eq!(
            registry.register("flow_rate", DataType::Int8, FieldKind::Parameter),
            Err(RegistryError::NameOccupied)
        );
    }

    #[test]
    fn test_oversized_name_is_rejected() {
        let mut registry = populated();
        let name = core::str::from_utf8(&[b'n'; 61]).unwrap();
        assert_eq!(
            registry.register(name, DataType::Uint8, FieldKind::Telemetry),
            Err(RegistryError::NameTooLong)
        );
    }

    #[test]
    fn test_full_registry_rejects_registration() {
        let mut registry: FieldRegistry<1> = FieldRegistry::new();
        registry
            .register("only", DataType::Uint8, FieldKind::Telemetry)
            .unwrap();
        assert_eq!(
            registry.register("more", DataType::Uint8, FieldKind::Telemetry),
            Err(RegistryError::NoFieldSlotLeft)
        );
    }

    #[test]
    fn test_value_cache_checks_types() {
        let mut registry = populated();
        let id = FieldId::new(2);
        assert!(registry.value(id).is_none());

        registry.set_value(id, TypedValue::Uint16(1500)).unwrap();
        assert_eq!(registry.value(id), Some(TypedValue::Uint16(1500)));

        assert_eq!(
            registry.set_value(id, TypedValue::Float32(1.5)),
            Err(RegistryError::TypeMismatch)
        );
        assert_eq!(
            registry.set_value(FieldId::new(9), TypedValue::Uint16(0)),
            Err(RegistryError::UnknownId)
        );
        // The failed writes left the cache alone.
        assert_eq!(registry.value(id), Some(TypedValue::Uint16(1500)));
    }

    #[test]
    fn test_lock_applies_to_parameters_only() {
        let mut registry = populated();
        let parameter = FieldId::new(2);
        let telemetry = FieldId::new(0);

        registry.set_lock(parameter, LockState::Locked).unwrap();
        assert!(registry.field(parameter).unwrap().is_locked());
        // Idempotent.
        registry.set_lock(parameter, LockState::Locked).unwrap();
        registry.set_lock(parameter, LockState::Unlocked).unwrap();
        assert!(!registry.field(parameter).unwrap().is_locked());

        assert_eq!(
            registry.set_lock(telemetry, LockState::Locked),
            Err(RegistryError::NotAParameter)
        );
        assert_eq!(
            registry.set_lock(FieldId::new(9), LockState::Locked),
            Err(RegistryError::UnknownId)
        );
    }

    #[test]
    fn test_group_definition_validates_members() {
        let mut registry = populated();
        let id = registry
            .define_group(&[FieldId::new(0), FieldId::new(1)])
            .unwrap();
        assert_eq!(id, GroupId::new(0));
        assert_eq!(
            registry.group(id).unwrap().member_ids(),
            &[FieldId::new(0), FieldId::new(1)]
        );

        assert_eq!(
            registry.define_group(&[FieldId::new(2)]),
            Err(RegistryError::NotTelemetry)
        );
        assert_eq!(
            registry.define_group(&[FieldId::new(9)]),
            Err(RegistryError::UnknownId)
        );
    }

    #[test]
    fn test_group_width_limit() {
        let mut registry: FieldRegistry<16> = FieldRegistry::new();
        let mut wide = heapless::Vec::<FieldId, 16>::new();
        for index in 0..16 {
            let mut name = String::<MAX_FIELD_NAME_LENGTH>::new();
            core::fmt::write(&mut name, format_args!("t{}", index)).unwrap();
            wide.push(
                registry
                    .register(&name, DataType::Float32, FieldKind::Telemetry)
                    .unwrap(),
            )
            .unwrap();
        }
        // 16 x 4 bytes = 64, three over the update limit.
        assert_eq!(registry.define_group(&wide), Err(RegistryError::GroupTooLarge));
        // 15 x 4 bytes = 60 fits.
        assert!(registry.define_group(&wide[..15]).is_ok());
    }

    #[test]
    fn test_group_slots_are_finite() {
        let mut registry = populated();
        for _ in 0..MAX_GROUP_COUNT {
            registry.define_group(&[FieldId::new(0)]).unwrap();
        }
        assert_eq!(
            registry.define_group(&[FieldId::new(0)]),
            Err(RegistryError::NoGroupSlotLeft)
        );
    }
}
