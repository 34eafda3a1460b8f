//! Kernel initialization and bootstrap module
#[cfg(target_arch = "x86")]
pub mod init;
pub mod status;

#[cfg(target_arch = "x86")]
pub use init::init_kernel;
pub use status::{
    all_components_ready, for_each_status, register_component, update_component_status,
    InitStatus,
};
