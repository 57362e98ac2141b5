/*
 * Responsibility
 * - middleware の公開インターフェース
 *   - auth::access (認証), auth::permission (認可), http (横断的な transport 設定)
 */
pub mod auth;
pub mod http;
