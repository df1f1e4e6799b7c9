pub use super::builds::Entity as Builds;
pub use super::deployments::Entity as Deployments;
pub use super::environment_variables::Entity as EnvironmentVariables;
pub use super::log_entries::Entity as LogEntries;
pub use super::projects::Entity as Projects;
pub use super::source_installations::Entity as SourceInstallations;
