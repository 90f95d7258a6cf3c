//! PDFコンテナ: ページ画像リソースの変換とコンテンツストリーム置換。
//!
//! ピクセル系メソッドはページが参照する画像XObjectをデコードして変換し、
//! 可逆フィルタ(FlateDecode)で同じ画像オブジェクトに書き戻す。
//! TokenHeuristicは画像には触れず、各ページのコンテンツストリームだけを
//! 解析・置換する。ページ構造そのものは変更しない。

use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use flate2::read::ZlibDecoder;
use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Document, Object, ObjectId};

use crate::container::ProcessOptions;
use crate::diagnostics::Diagnostics;
use crate::error::WatermarkError;
use crate::method::Method;
use crate::transform::content_stream::strip_text_watermarks;

/// 画像XObjectのメタデータ。
#[derive(Debug, Clone)]
struct ImageMeta {
    width: u32,
    height: u32,
    bits_per_component: u8,
    color_space: String,
    filter: Option<String>,
}

/// PDFを処理して出力パスに保存する。
pub fn process_pdf(
    input_path: &Path,
    output_path: &Path,
    options: &ProcessOptions,
    diagnostics: &dyn Diagnostics,
) -> crate::error::Result<()> {
    let mut doc = Document::load(input_path)?;

    match options.method {
        Method::TokenHeuristic => rewrite_content_streams(&mut doc, options, diagnostics)?,
        Method::ColorReplace | Method::ThresholdMask => rewrite_embedded_images(&mut doc, options)?,
    }

    doc.save(output_path)
        .map_err(|e| WatermarkError::encode(e.to_string()))?;
    Ok(())
}

/// 各ページのコンテンツストリームをヒューリスティックで書き換える。
fn rewrite_content_streams(
    doc: &mut Document,
    options: &ProcessOptions,
    diagnostics: &dyn Diagnostics,
) -> crate::error::Result<()> {
    let pages: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();

    for (_page_num, page_id) in pages {
        let content = doc.get_page_content(page_id)?;
        let stripped = strip_text_watermarks(&content, &options.heuristic, diagnostics)?;
        doc.change_page_content(page_id, stripped)?;
    }

    Ok(())
}

/// 全ページの画像XObjectを変換してFlateDecodeで書き戻す。
///
/// 同じ画像オブジェクトが複数ページから参照されていても変換は1回だけ。
fn rewrite_embedded_images(
    doc: &mut Document,
    options: &ProcessOptions,
) -> crate::error::Result<()> {
    let image_ids = collect_page_image_ids(doc)?;

    for id in image_ids {
        let stream = doc
            .get_object(id)
            .and_then(Object::as_stream)?
            .clone();

        let meta = read_image_meta(doc, &stream)?;
        let decoded = decode_image_stream(&stream, &meta)?;
        let transformed = crate::container::apply_pixel_transform(&decoded, options)?;

        // 可逆フィルタで再エンコード
        let (raw, color_space) = if transformed.color().has_color() {
            (transformed.to_rgb8().into_raw(), "DeviceRGB")
        } else {
            (transformed.to_luma8().into_raw(), "DeviceGray")
        };
        let compressed = flate_encode(&raw)?;

        let Some(Object::Stream(stream)) = doc.objects.get_mut(&id) else {
            continue;
        };
        stream.dict.set("Filter", "FlateDecode");
        stream.dict.set("ColorSpace", color_space);
        stream.dict.set("BitsPerComponent", 8);
        stream.dict.remove(b"DecodeParms");
        stream.set_content(compressed);
    }

    Ok(())
}

/// 各ページの画像リソースが参照するSubtype=ImageのXObject IDを収集する。
fn collect_page_image_ids(doc: &Document) -> crate::error::Result<Vec<ObjectId>> {
    let mut ids: BTreeSet<ObjectId> = BTreeSet::new();

    for (_page_num, page_id) in doc.get_pages() {
        let (resource_dict, resource_ids) = doc.get_page_resources(page_id)?;

        if let Some(dict) = resource_dict {
            collect_image_ids_from_dict(doc, dict, &mut ids)?;
        }
        for res_id in resource_ids {
            let dict = doc.get_dictionary(res_id)?;
            collect_image_ids_from_dict(doc, dict, &mut ids)?;
        }
    }

    Ok(ids.into_iter().collect())
}

/// リソース辞書のXObjectエントリからSubtype=Imageの参照先IDを集める。
fn collect_image_ids_from_dict(
    doc: &Document,
    dict: &lopdf::Dictionary,
    ids: &mut BTreeSet<ObjectId>,
) -> crate::error::Result<()> {
    let xobject_entry = match dict.get(b"XObject") {
        Ok(entry) => entry,
        Err(_) => return Ok(()), // XObjectエントリがない場合は何もしない
    };

    let xobject_dict = match xobject_entry {
        Object::Dictionary(d) => d,
        Object::Reference(id) => doc.get_object(*id).and_then(Object::as_dict)?,
        _ => return Ok(()),
    };

    for (_name_bytes, value) in xobject_dict.iter() {
        let Object::Reference(id) = value else {
            continue;
        };
        let Ok(stream) = doc.get_object(*id).and_then(Object::as_stream) else {
            continue;
        };
        if let Ok(subtype) = stream.dict.get(b"Subtype").and_then(Object::as_name)
            && subtype == b"Image"
        {
            ids.insert(*id);
        }
    }

    Ok(())
}

/// 画像XObjectのストリーム辞書からメタデータを読み取る。
///
/// ColorSpaceの参照は実体のNameへ解決する。Nameに解決できない値
/// （ICCBased配列など）は黙ってデフォルト扱いせず拒否する。
fn read_image_meta(doc: &Document, stream: &lopdf::Stream) -> crate::error::Result<ImageMeta> {
    let dict = &stream.dict;

    let width = dict_get_u32(dict, b"Width")?;
    let height = dict_get_u32(dict, b"Height")?;
    // BitsPerComponent: キーが無い場合のみデフォルト8
    let bits_per_component = match dict.get(b"BitsPerComponent") {
        Ok(_) => dict_get_u32(dict, b"BitsPerComponent")? as u8,
        Err(_) => 8,
    };

    let color_space = match dict.get(b"ColorSpace") {
        Ok(Object::Name(name)) => String::from_utf8_lossy(name).to_string(),
        Ok(Object::Reference(id)) => match doc.get_object(*id)? {
            Object::Name(name) => String::from_utf8_lossy(name).to_string(),
            other => {
                return Err(WatermarkError::decode(format!(
                    "unsupported color space object: {other:?}"
                )));
            }
        },
        Ok(other) => {
            return Err(WatermarkError::decode(format!(
                "unsupported color space object: {other:?}"
            )));
        }
        // ColorSpaceキー自体が無い場合のみデフォルト
        Err(_) => "DeviceRGB".to_string(),
    };

    let filter = match dict.get(b"Filter") {
        Ok(Object::Name(name)) => Some(String::from_utf8_lossy(name).to_string()),
        Ok(Object::Array(arr)) => arr.first().and_then(|obj| {
            if let Object::Name(name) = obj {
                Some(String::from_utf8_lossy(name).to_string())
            } else {
                None
            }
        }),
        _ => None,
    };

    Ok(ImageMeta {
        width,
        height,
        bits_per_component,
        color_space,
        filter,
    })
}

/// 辞書からu32値を取得するヘルパー（負の値はエラー）。
fn dict_get_u32(dict: &lopdf::Dictionary, key: &[u8]) -> crate::error::Result<u32> {
    match dict.get(key) {
        Ok(Object::Integer(i)) if (0..=u32::MAX as i64).contains(i) => Ok(*i as u32),
        Ok(other) => Err(WatermarkError::decode(format!(
            "expected non-negative integer for {:?}, got {:?}",
            String::from_utf8_lossy(key),
            other
        ))),
        Err(_) => Err(WatermarkError::decode(format!(
            "missing required image key: {:?}",
            String::from_utf8_lossy(key)
        ))),
    }
}

/// 画像XObjectのストリームデータをデコードしてDynamicImageに変換する。
///
/// 対応フィルタ: DCTDecode (JPEG)、FlateDecode (raw + zlib)、非圧縮。
fn decode_image_stream(
    stream: &lopdf::Stream,
    meta: &ImageMeta,
) -> crate::error::Result<DynamicImage> {
    let raw = &stream.content;

    match meta.filter.as_deref() {
        Some("DCTDecode") => decode_jpeg(raw),
        Some("FlateDecode") => decode_flate(raw, meta),
        None => decode_raw(raw, meta),
        Some(other) => Err(WatermarkError::decode(format!(
            "unsupported image filter: {other}"
        ))),
    }
}

fn decode_jpeg(data: &[u8]) -> crate::error::Result<DynamicImage> {
    let reader = image::ImageReader::new(std::io::Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| WatermarkError::decode(format!("JPEG decode error: {e}")))?;
    reader
        .decode()
        .map_err(|e| WatermarkError::decode(format!("JPEG decode error: {e}")))
}

fn decode_flate(data: &[u8], meta: &ImageMeta) -> crate::error::Result<DynamicImage> {
    let mut decoder = ZlibDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| WatermarkError::decode(format!("FlateDecode error: {e}")))?;
    decode_raw(&decompressed, meta)
}

/// Raw pixelデータからDynamicImageを構築する。
fn decode_raw(data: &[u8], meta: &ImageMeta) -> crate::error::Result<DynamicImage> {
    let w = meta.width;
    let h = meta.height;

    match (meta.color_space.as_str(), meta.bits_per_component) {
        ("DeviceRGB", 8) => {
            let expected = (w as usize) * (h as usize) * 3;
            if data.len() < expected {
                return Err(WatermarkError::decode(format!(
                    "RGB data too short: expected {}, got {}",
                    expected,
                    data.len()
                )));
            }
            let img = RgbImage::from_raw(w, h, data[..expected].to_vec()).ok_or_else(|| {
                WatermarkError::decode("failed to create RGB image from raw data")
            })?;
            Ok(DynamicImage::ImageRgb8(img))
        }
        ("DeviceGray", 8) => {
            let expected = (w as usize) * (h as usize);
            if data.len() < expected {
                return Err(WatermarkError::decode(format!(
                    "Gray data too short: expected {}, got {}",
                    expected,
                    data.len()
                )));
            }
            let img = GrayImage::from_raw(w, h, data[..expected].to_vec()).ok_or_else(|| {
                WatermarkError::decode("failed to create Gray image from raw data")
            })?;
            Ok(DynamicImage::ImageLuma8(img))
        }
        (cs, bpc) => Err(WatermarkError::decode(format!(
            "unsupported color space / BPC combination: {cs} / {bpc}"
        ))),
    }
}

/// zlibで圧縮する。
fn flate_encode(data: &[u8]) -> crate::error::Result<Vec<u8>> {
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| WatermarkError::encode(format!("Flate encode error: {e}")))?;
    encoder
        .finish()
        .map_err(|e| WatermarkError::encode(format!("Flate encode error: {e}")))
}
