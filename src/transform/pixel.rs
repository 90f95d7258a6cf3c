//! ビットマップ変換: HSV閾値マスクとRGB完全一致置換。
//!
//! どちらの変換も純粋関数: 同じ入力と設定からは常に同じ出力が得られる。

use image::{DynamicImage, Rgb, Rgba, RgbaImage};

/// 置換先の白。
const WHITE: [u8; 3] = [255, 255, 255];

/// 彩度の2値化閾値。これを超える画素は元画像の内容として保持する。
const SATURATION_THRESHOLD: u8 = 92;

/// 明度の2値化閾値。これ以下の画素（暗い画素）は本文として保持する。
const VALUE_THRESHOLD: u8 = 128;

/// RGB→RGBの順序付き置換マップ。ColorReplaceが消費する。
#[derive(Debug, Clone)]
pub struct ReplacementMap {
    pairs: Vec<([u8; 3], [u8; 3])>,
}

impl ReplacementMap {
    pub fn new(pairs: Vec<([u8; 3], [u8; 3])>) -> Self {
        Self { pairs }
    }

    pub fn pairs(&self) -> &[([u8; 3], [u8; 3])] {
        &self.pairs
    }
}

impl Default for ReplacementMap {
    /// 既知の透かしレンダリング色に合わせた既定マップ。
    fn default() -> Self {
        Self {
            pairs: vec![
                ([240, 240, 240], WHITE),
                ([192, 192, 192], WHITE),
                ([180, 180, 254], WHITE),
            ],
        }
    }
}

/// RGB画素から8bit HSVの彩度と明度を計算する。
///
/// OpenCVの8bit HSV規約に従う: V = max(r,g,b)、S = 255*(V-min)/V（V=0のときS=0）。
fn saturation_value(r: u8, g: u8, b: u8) -> (u8, u8) {
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    if v == 0 {
        return (0, 0);
    }
    let s = ((v - min) as u32 * 255 / v as u32) as u8;
    (s, v)
}

/// 画素が白塗り対象かどうかを判定する。
///
/// 閾値マスクの合成: thresh1 = (S > 92)、thresh2 = NOT(V > 128)、
/// mask = thresh1 saturating-OR thresh2。mask == 0 の画素のみ白にする。
/// つまり低彩度かつ中〜高明度のオーバーレイ（透かしインク）だけが対象になり、
/// 高コントラストの本文や彩度の高い内容はそのまま残る。
fn mask_is_zero(r: u8, g: u8, b: u8) -> bool {
    let (s, v) = saturation_value(r, g, b);
    s <= SATURATION_THRESHOLD && v > VALUE_THRESHOLD
}

/// HSV閾値マスクで透かしを除去する。
///
/// マスクが0の画素を純白に置き換え、それ以外は変更しない。
/// アルファチャンネルは保持する。
pub fn threshold_mask(img: &DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageRgb8(rgb) => {
            let mut out = rgb.clone();
            for pixel in out.pixels_mut() {
                let [r, g, b] = pixel.0;
                if mask_is_zero(r, g, b) {
                    *pixel = Rgb(WHITE);
                }
            }
            DynamicImage::ImageRgb8(out)
        }
        DynamicImage::ImageRgba8(rgba) => {
            let mut out = rgba.clone();
            for pixel in out.pixels_mut() {
                let [r, g, b, a] = pixel.0;
                if mask_is_zero(r, g, b) {
                    *pixel = Rgba([WHITE[0], WHITE[1], WHITE[2], a]);
                }
            }
            DynamicImage::ImageRgba8(out)
        }
        other => {
            // その他のフォーマットはRGBAに変換して処理
            let mut out: RgbaImage = other.to_rgba8();
            for pixel in out.pixels_mut() {
                let [r, g, b, a] = pixel.0;
                if mask_is_zero(r, g, b) {
                    *pixel = Rgba([WHITE[0], WHITE[1], WHITE[2], a]);
                }
            }
            DynamicImage::ImageRgba8(out)
        }
    }
}

/// 置換マップによるRGB完全一致置換。
///
/// マップの各ペアを順に全画素へ適用する（前のペアの置換結果に次のペアが
/// 作用しうる）。一致判定は完全一致のみで許容誤差はない。
/// アルファチャンネルは変更しない。
pub fn color_replace(img: &DynamicImage, map: &ReplacementMap) -> DynamicImage {
    match img {
        DynamicImage::ImageRgb8(rgb) => {
            let mut out = rgb.clone();
            for &(old, new) in map.pairs() {
                for pixel in out.pixels_mut() {
                    if pixel.0 == old {
                        *pixel = Rgb(new);
                    }
                }
            }
            DynamicImage::ImageRgb8(out)
        }
        DynamicImage::ImageRgba8(rgba) => {
            let mut out = rgba.clone();
            for &(old, new) in map.pairs() {
                for pixel in out.pixels_mut() {
                    let [r, g, b, a] = pixel.0;
                    if [r, g, b] == old {
                        *pixel = Rgba([new[0], new[1], new[2], a]);
                    }
                }
            }
            DynamicImage::ImageRgba8(out)
        }
        other => {
            let mut out: RgbaImage = other.to_rgba8();
            for &(old, new) in map.pairs() {
                for pixel in out.pixels_mut() {
                    let [r, g, b, a] = pixel.0;
                    if [r, g, b] == old {
                        *pixel = Rgba([new[0], new[1], new[2], a]);
                    }
                }
            }
            DynamicImage::ImageRgba8(out)
        }
    }
}
