pub(crate) mod chat;
pub(crate) mod classify;
pub(crate) mod deposit;
pub(crate) mod orders;
pub(crate) mod reward;
pub(crate) mod session;
