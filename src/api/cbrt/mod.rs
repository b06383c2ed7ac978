/*
 * Responsibility
 * - /cbrt 配下 (release workflow) の公開ポイント
 */
pub mod dto;
pub mod extractors;
pub mod handlers;
mod routes;

pub use routes::routes;
