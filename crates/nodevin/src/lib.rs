// nodevin: the command-line front end. Parses arguments, dispatches to the
// engine and runs the background updater daemon.
//
//   main → commands::execute → LifecycleController / InfoAggregator / request
//   daemon start → Daemon::run → SelfUpdater + ImageUpdater

pub mod cli;
pub mod commands;
pub mod daemon;
pub mod self_updater;
