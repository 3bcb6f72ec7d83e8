#![warn(clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::absolute_paths,
    clippy::future_not_send,
    clippy::implicit_return,
    clippy::min_ident_chars,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::non_ascii_literal,
    clippy::option_if_let_else,
    clippy::question_mark_used,
    clippy::self_named_module_files,
    clippy::shadow_reuse,
    clippy::shadow_unrelated,
    clippy::single_call_fn,
    async_fn_in_trait,
)]

pub mod auth;
pub mod config;
pub mod feed;
pub mod issue;
pub mod mail;
pub mod message;
pub mod notify;
pub mod novelty;
pub mod poller;
pub mod scrape;
pub mod translate;
pub mod util;
