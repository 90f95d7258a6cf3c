//! DOCXコンテナ: ZIP内のメディアエントリだけを変換して再構築する。
//!
//! メディア以外のエントリは元の圧縮データのまま複製するため、入出力で
//! バイト単位に一致する。アーカイブコメントもそのまま引き継ぐ。

use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::container::ProcessOptions;
use crate::error::WatermarkError;

/// ワードプロセッサパッケージが埋め込み画像を置く固定プレフィックス。
const MEDIA_PREFIX: &str = "word/media/";

/// DOCXを処理して出力パスに保存する。
pub fn process_docx(
    input_path: &Path,
    output_path: &Path,
    options: &ProcessOptions,
) -> crate::error::Result<()> {
    let file = File::open(input_path)?;
    let mut archive = ZipArchive::new(file)?;

    // 1段目: メディアエントリをデコード・変換し、差し替えデータをステージする
    let mut staged: HashMap<String, Vec<u8>> = HashMap::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() || !entry.name().starts_with(MEDIA_PREFIX) {
            continue;
        }
        let name = entry.name().to_string();

        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;

        let decoded = image::load_from_memory(&bytes)?;
        let transformed = crate::container::apply_pixel_transform(&decoded, options)?;

        // 可逆なPNGで再エンコードする（エントリパスは変えない）
        let mut encoded = Vec::new();
        transformed
            .write_to(&mut Cursor::new(&mut encoded), image::ImageFormat::Png)
            .map_err(|e| WatermarkError::encode(e.to_string()))?;

        staged.insert(name, encoded);
    }

    // 2段目: 全エントリを元の順序で出力ZIPに流し込む。
    let out = File::create(output_path)?;
    rebuild_archive(&mut archive, out, &staged)
}

/// ステージ済みエントリだけ新データで書き、他は生データのままコピーする。
///
/// 入力側の失敗はデコードエラー、出力側の失敗はエンコードエラーになる。
fn rebuild_archive<R: Read + Seek, W: Write + Seek>(
    archive: &mut ZipArchive<R>,
    out: W,
    staged: &HashMap<String, Vec<u8>>,
) -> crate::error::Result<()> {
    let mut writer = ZipWriter::new(out);
    writer.set_raw_comment(archive.comment().to_vec().into_boxed_slice());

    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        let name = entry.name().to_string();

        match staged.get(&name) {
            Some(new_bytes) => {
                let entry_options = SimpleFileOptions::default()
                    .compression_method(CompressionMethod::Deflated);
                writer
                    .start_file(name, entry_options)
                    .map_err(|e| WatermarkError::encode(e.to_string()))?;
                writer
                    .write_all(new_bytes)
                    .map_err(|e| WatermarkError::encode(e.to_string()))?;
            }
            None => {
                writer
                    .raw_copy_file(entry)
                    .map_err(|e| WatermarkError::encode(e.to_string()))?;
            }
        }
    }

    writer
        .finish()
        .map_err(|e| WatermarkError::encode(e.to_string()))?;
    Ok(())
}
