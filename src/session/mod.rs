pub mod api;
pub mod auto_auth_session;
pub mod dto;
pub mod urls;
pub mod wqb_session;

pub use api::{ApiReply, SimulationApi};
pub use auto_auth_session::AutoAuthSession;
pub use urls::{ApiUrls, WQB_API_URL};
pub use wqb_session::WQBSession;
