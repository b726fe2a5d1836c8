// nodevin-engine: everything between the CLI and the container runtime.
//
// The catalogue turns a network key into a NetworkConfig, the compose module
// renders it to a descriptor, and the lifecycle controller drives the runtime
// through DockerCommandManager. Status reporting and image updates read the
// same runtime state back.

pub mod catalogue;
pub mod compose;
pub mod container;
pub mod image_updater;
pub mod info;
pub mod lifecycle;
pub mod network_config;
pub mod probe;
pub mod reaper;
pub mod request;

#[cfg(any(test, feature = "testing"))]
pub mod test_http;

pub use catalogue::{Catalogue, Companion, NetworkSpec, Software};
pub use compose::{create_compose_file, ComposeFile};
pub use container::{check_runtime_available, DockerCommandManager, ExecOptions};
pub use image_updater::{DigestSource, DockerHubDigestSource, ImageUpdater, UpdateReport};
pub use info::{InfoAggregator, InfoReport};
pub use lifecycle::{LifecycleController, StartReport, StartRequest, StopOutcome, Target};
pub use network_config::NetworkConfig;
pub use probe::{ChainProbe, HttpChainProbe};
pub use reaper::{ReapReport, Reaper};
pub use request::RpcRequest;
