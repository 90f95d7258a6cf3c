//! コンテナディスパッチ: 種別判定、抽出、変換呼び出し、再組立。
//!
//! 入力ドキュメントは読み取り専用で開き、変換結果は新規作成した出力
//! ファイルに書き込む。入力を書き換えることはない。

pub mod docx;
pub mod pdf;
pub mod raster;

use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::diagnostics::Diagnostics;
use crate::error::WatermarkError;
use crate::method::Method;
use crate::transform::content_stream::HeuristicConfig;
use crate::transform::pixel::{ReplacementMap, color_replace, threshold_mask};

/// 既定の出力ファイル名に付与する固定サフィックス。
pub const OUTPUT_SUFFIX: &str = "_generated";

/// 対応するコンテナ種別。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Docx,
    Pdf,
    Raster,
}

/// 1回の処理で使う設定一式。メソッドは実行ごとに1つだけ選ばれる。
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub method: Method,
    pub replacements: ReplacementMap,
    pub heuristic: HeuristicConfig,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            method: Method::ThresholdMask,
            replacements: ReplacementMap::default(),
            heuristic: HeuristicConfig::default(),
        }
    }
}

/// 拡張子からコンテナ種別を判定する。対応外はUnsupportedFormat。
fn detect_kind(input_path: &Path) -> crate::error::Result<ContainerKind> {
    let ext = input_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "docx" => Ok(ContainerKind::Docx),
        "pdf" => Ok(ContainerKind::Pdf),
        "png" | "jpg" | "jpeg" => Ok(ContainerKind::Raster),
        _ => Err(WatermarkError::unsupported_format(format!(
            "'{}' (expected .docx, .pdf, .png, .jpg or .jpeg)",
            input_path.display()
        ))),
    }
}

/// 既定の出力パスを導出する: 入力と同じディレクトリ・拡張子で、
/// ファイル名は入力のstemに固定サフィックスを付けたもの。
pub fn default_output_path(input_path: &Path) -> PathBuf {
    let stem = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let file_name = match input_path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}{OUTPUT_SUFFIX}.{ext}"),
        None => format!("{stem}{OUTPUT_SUFFIX}"),
    };
    input_path.with_file_name(file_name)
}

/// 1ファイルを処理し、出力パスを返す。
///
/// 検証（存在・拡張子・メソッド適合）はすべてのファイルI/Oより先に行う。
/// 出力パス未指定時は既定パスを導出する。出力先に既存ファイルがあれば
/// 書き込み前に削除し、処理が失敗した場合は書きかけの出力も削除する。
/// 失敗は診断ポートにも転送される（通知は結果に影響しない）。
pub fn process(
    input_path: &Path,
    output_path: Option<PathBuf>,
    options: &ProcessOptions,
    diagnostics: &dyn Diagnostics,
) -> crate::error::Result<PathBuf> {
    match process_inner(input_path, output_path, options, diagnostics) {
        Ok(path) => Ok(path),
        Err(e) => {
            diagnostics.report_exception(&e);
            Err(e)
        }
    }
}

fn process_inner(
    input_path: &Path,
    output_path: Option<PathBuf>,
    options: &ProcessOptions,
    diagnostics: &dyn Diagnostics,
) -> crate::error::Result<PathBuf> {
    if !input_path.exists() {
        return Err(WatermarkError::not_found(
            input_path.display().to_string(),
        ));
    }

    let kind = detect_kind(input_path)?;

    // TokenHeuristicはコンテンツストリームに束縛されたメソッドであり、
    // コンテンツストリームを持つのはPDFコンテナだけ
    if options.method == Method::TokenHeuristic && kind != ContainerKind::Pdf {
        return Err(WatermarkError::invalid_method(format!(
            "method '{}' only applies to PDF input",
            options.method.selector()
        )));
    }

    let output = output_path.unwrap_or_else(|| default_output_path(input_path));
    if output.exists() {
        std::fs::remove_file(&output)?;
    }

    let result = match kind {
        ContainerKind::Docx => docx::process_docx(input_path, &output, options),
        ContainerKind::Pdf => pdf::process_pdf(input_path, &output, options, diagnostics),
        ContainerKind::Raster => raster::process_raster(input_path, &output, options),
    };

    match result {
        Ok(()) => {
            tracing::info!(
                target: "watermark_removal",
                input = %input_path.display(),
                output = %output.display(),
                method = options.method.selector(),
                "processed"
            );
            Ok(output)
        }
        Err(e) => {
            // 書きかけの出力を残さない
            if output.exists() {
                let _ = std::fs::remove_file(&output);
            }
            Err(e)
        }
    }
}

/// 複数ファイルを入力順に逐次処理する。
///
/// 1ファイルの失敗はそのファイルの結果エントリに変換され、残りの処理は
/// 継続する（バッチ全体が失敗することはない）。並列実行は行わない。
/// `output_dir` 指定時は各入力の既定ファイル名をそのディレクトリに置く。
pub fn process_batch(
    input_paths: &[PathBuf],
    output_dir: Option<&Path>,
    options: &ProcessOptions,
    diagnostics: &dyn Diagnostics,
) -> Vec<crate::error::Result<PathBuf>> {
    input_paths
        .iter()
        .map(|input| {
            let output = output_dir.map(|dir| {
                let default_name = default_output_path(input);
                match default_name.file_name() {
                    Some(name) => dir.join(name),
                    None => dir.join("output"),
                }
            });
            process(input, output, options, diagnostics)
        })
        .collect()
}

/// 選択中のメソッドに対応するピクセル変換を適用する。
pub(crate) fn apply_pixel_transform(
    img: &DynamicImage,
    options: &ProcessOptions,
) -> crate::error::Result<DynamicImage> {
    match options.method {
        Method::ColorReplace => Ok(color_replace(img, &options.replacements)),
        Method::ThresholdMask => Ok(threshold_mask(img)),
        Method::TokenHeuristic => Err(WatermarkError::invalid_method(
            "token-heuristic is not a pixel transform",
        )),
    }
}
