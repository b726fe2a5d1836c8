pub mod container_info;
pub mod docker_command_manager;

#[cfg(test)]
pub(crate) mod testing;

pub use container_info::{compact_ports, ContainerInfo};
pub use docker_command_manager::{check_runtime_available, DockerCommandManager, ExecOptions};
