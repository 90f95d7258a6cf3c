//! 診断ポート。テレメトリ連携先は差し替え可能にし、コアは具象実装に依存しない。

use crate::error::WatermarkError;

/// 処理中の警告・例外を外部に通知するポート。
///
/// 実装は失敗してはならない（通知の失敗が処理結果に影響しないこと）。
pub trait Diagnostics {
    fn report_warning(&self, message: &str);
    fn report_exception(&self, error: &WatermarkError);
}

/// 何もしないデフォルト実装。
#[derive(Debug, Default)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn report_warning(&self, _message: &str) {}
    fn report_exception(&self, _error: &WatermarkError) {}
}

/// tracingに転送する実装。CLIフロントエンドが使用する。
#[derive(Debug, Default)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn report_warning(&self, message: &str) {
        tracing::warn!(target: "watermark_removal", "{message}");
    }

    fn report_exception(&self, error: &WatermarkError) {
        tracing::error!(target: "watermark_removal", "{error}");
    }
}
