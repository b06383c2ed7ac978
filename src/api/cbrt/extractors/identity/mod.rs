/*!
 * Identity extractor
 *
 * Responsibility:
 * - ロールゲートを通過したリクエストの IdentityContext を handler に渡す
 * - 型 (IdentityContext) は services::auth 側にあり、ここは axum との接着のみ
 */

mod core;

pub use self::core::Identity;
