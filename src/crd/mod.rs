//! Custom Resource Definitions for the virt controller
//!
//! This module contains the CRDs the migration job controller reconciles
//! against: the VirtualMachine being migrated and the Migration request
//! describing the move.

mod migration;
mod virtual_machine;

pub use migration::{Migration, MigrationPhase, MigrationSpec, MigrationStatus};
pub use virtual_machine::{VirtualMachine, VirtualMachineSpec, VirtualMachineStatus, VmPhase};
