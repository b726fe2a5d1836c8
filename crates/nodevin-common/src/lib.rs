// nodevin-common: shared infrastructure for nodevin.
// Depends only on nodevin-sdk; provides the error taxonomy, layered settings,
// the data-directory manager, HTTP clients and logging setup.

pub mod constants;
pub mod data_dir;
pub mod error;
pub mod http_client_factory;
pub mod logging;
pub mod settings;

pub use data_dir::{DataDirectory, DirectoryUsage};
pub use error::{NodevinError, Result};
pub use http_client_factory::HttpClientFactory;
pub use settings::{Settings, SettingsOverrides};
