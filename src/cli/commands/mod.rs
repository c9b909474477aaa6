pub mod auth;
pub mod dlg;
pub mod job;
pub mod nlu;
pub mod project;
pub mod sys;

pub use auth::{AuthCommands, handle_auth_command};
pub use dlg::{DlgCommands, handle_dlg_command};
pub use job::{JobCommands, handle_job_command};
pub use nlu::{NluCommands, handle_nlu_command};
pub use project::{ProjectCommands, handle_project_command};
pub use sys::{SysCommands, handle_sys_command};
