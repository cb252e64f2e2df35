use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum Role {
    Admin = 1,
    Commercial = 2,
    Technician = 3,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Commercial),
            3 => Some(Role::Technician),
            _ => None,
        }
    }

    /// Only field staff clock in and out; admins supervise.
    pub fn clocks_in(&self) -> bool {
        !matches!(self, Role::Admin)
    }
}
