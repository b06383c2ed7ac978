/*
 * Responsibility
 * - middleware の公開インターフェース
 * - auth: ルート単位のロールゲート / cors・http・security_headers: Router 全体に掛けるもの
 */
pub mod auth;
pub mod cors;
pub mod http;
pub mod security_headers;
