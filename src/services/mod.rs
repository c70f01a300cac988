pub mod dispatcher;
pub mod scheduler;
pub mod wecom_client;

pub use dispatcher::{MessageDispatcher, INFO_UPDATE_KEYWORD};
pub use scheduler::SchedulerHandle;
pub use wecom_client::{AccessTokenCache, ClientError, MessageSender, WeComClient, TOKEN_SAFETY_MARGIN};
