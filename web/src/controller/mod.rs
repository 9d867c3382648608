pub(crate) mod comment_controller;
pub(crate) mod feed_controller;
pub(crate) mod health_check_controller;
pub(crate) mod notification_controller;
pub(crate) mod post_controller;
pub(crate) mod user_controller;
pub(crate) mod user_session_controller;
