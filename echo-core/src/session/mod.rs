pub mod echo_session;
