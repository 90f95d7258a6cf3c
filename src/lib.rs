//! 透かし除去エンジン。
//!
//! 3種類のドキュメントコンテナ（単体ラスタ画像、PDF、ZIPパッケージの
//! ワードプロセッサ文書）から、選択された除去メソッドで透かしを取り除く。
//! フロントエンドは [`container::process`] / [`container::process_batch`] を
//! 呼び出すだけでよく、エンジンは具象的なUI・テレメトリ実装に依存しない。

pub mod config;
pub mod container;
pub mod diagnostics;
pub mod error;
pub mod method;
pub mod transform;

pub use container::{ProcessOptions, default_output_path, process, process_batch};
pub use diagnostics::{Diagnostics, LogDiagnostics, NullDiagnostics};
pub use error::{Result, WatermarkError};
pub use method::Method;
