//! 単体ラスタ画像: デコード、変換、入力拡張子に合わせた形式で出力。

use std::path::Path;

use image::{DynamicImage, ImageFormat};

use crate::container::ProcessOptions;
use crate::error::WatermarkError;

/// 入力拡張子に対応する出力フォーマットを返す。
fn format_for_input(input_path: &Path) -> crate::error::Result<ImageFormat> {
    let ext = input_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "png" => Ok(ImageFormat::Png),
        "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
        other => Err(WatermarkError::unsupported_format(format!(
            "unsupported raster extension: '{other}'"
        ))),
    }
}

/// 単体画像を処理して出力パスに保存する。
pub fn process_raster(
    input_path: &Path,
    output_path: &Path,
    options: &ProcessOptions,
) -> crate::error::Result<()> {
    let format = format_for_input(input_path)?;

    let decoded = image::open(input_path)?;
    let transformed = crate::container::apply_pixel_transform(&decoded, options)?;

    // JPEGはアルファを持てないためRGBに落とす
    let to_save = match (format, &transformed) {
        (ImageFormat::Jpeg, DynamicImage::ImageRgba8(_)) => {
            DynamicImage::ImageRgb8(transformed.to_rgb8())
        }
        _ => transformed,
    };

    to_save
        .save_with_format(output_path, format)
        .map_err(|e| WatermarkError::encode(e.to_string()))?;
    Ok(())
}
