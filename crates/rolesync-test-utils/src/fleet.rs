//! Canned two-group directory.
//!
//! Primary "Fleet" roles, in order:
//! - 10 "Pilot", 11 "Engineer", 12 "Officer", 13 "Cadet" (no secondary match)
//!
//! Secondary "Fleet Ops" roles, in order:
//! - 20 "Junior Officer", 21 "Officer Corps", 22 "Senior Pilot", 23 "Engineer"
//!
//! Members:
//! - 100 ana: primary {Pilot, Officer}, secondary {}
//! - 101 bo: primary {Engineer}, secondary {Senior Pilot, Engineer}
//! - 102 cy: primary {Pilot}, no secondary identity
//! - 103 di: primary {}, secondary {Junior Officer}

use rolesync_core::{DirectorySnapshot, GroupId, GroupPair, GroupSnapshot, Member, RoleId, UserId};

pub const PRIMARY: u64 = 607066249381543946;
pub const SECONDARY: u64 = 1346226782306832465;
pub const COMMANDS: u64 = 1298147393191284736;

pub const PILOT: RoleId = RoleId(10);
pub const ENGINEER: RoleId = RoleId(11);
pub const OFFICER: RoleId = RoleId(12);
pub const CADET: RoleId = RoleId(13);

pub const JUNIOR_OFFICER: RoleId = RoleId(20);
pub const OFFICER_CORPS: RoleId = RoleId(21);
pub const SENIOR_PILOT: RoleId = RoleId(22);
pub const SECONDARY_ENGINEER: RoleId = RoleId(23);

pub const ANA: UserId = UserId(100);
pub const BO: UserId = UserId(101);
pub const CY: UserId = UserId(102);
pub const DI: UserId = UserId(103);

pub fn groups() -> GroupPair {
    GroupPair {
        primary: GroupId(PRIMARY),
        secondary: GroupId(SECONDARY),
    }
}

pub fn snapshot() -> DirectorySnapshot {
    DirectorySnapshot::new()
        .with_group(
            GroupSnapshot::new(PRIMARY, "Fleet")
                .with_role(10, "Pilot")
                .with_role(11, "Engineer")
                .with_role(12, "Officer")
                .with_role(13, "Cadet")
                .with_member(Member::new(100, "ana").with_roles([10, 12]))
                .with_member(Member::new(101, "bo").with_roles([11]))
                .with_member(Member::new(102, "cy").with_roles([10]))
                .with_member(Member::new(103, "di")),
        )
        .with_group(
            GroupSnapshot::new(SECONDARY, "Fleet Ops")
                .with_role(20, "Junior Officer")
                .with_role(21, "Officer Corps")
                .with_role(22, "Senior Pilot")
                .with_role(23, "Engineer")
                .with_member(Member::new(100, "ana"))
                .with_member(Member::new(101, "bo").with_roles([22, 23]))
                .with_member(Member::new(103, "di").with_roles([20])),
        )
}
