//! 除去メソッドの選択テーブル。

/// 透かし除去メソッド。各メソッドはちょうど1つの変換に対応する。
///
/// - `TokenHeuristic`: PDFコンテンツストリームの命令単位ヒューリスティック
/// - `ColorReplace`: RGB完全一致による色置換
/// - `ThresholdMask`: HSV閾値マスクによる白塗り
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    TokenHeuristic,
    ColorReplace,
    ThresholdMask,
}

/// セレクタ文字列とメソッドの静的対応表。
const METHOD_TABLE: &[(&str, Method)] = &[
    ("token-heuristic", Method::TokenHeuristic),
    ("color-replace", Method::ColorReplace),
    ("threshold-mask", Method::ThresholdMask),
];

impl Method {
    /// セレクタ文字列をパースする。未知のセレクタはInvalidMethod。
    pub fn parse(selector: &str) -> crate::error::Result<Self> {
        match selector {
            "token-heuristic" => Ok(Method::TokenHeuristic),
            "color-replace" => Ok(Method::ColorReplace),
            "threshold-mask" => Ok(Method::ThresholdMask),
            other => Err(crate::error::WatermarkError::invalid_method(format!(
                "unknown method selector '{}' (expected one of: {})",
                other,
                Self::selectors().join(", ")
            ))),
        }
    }

    /// セレクタ文字列を返す。
    pub fn selector(&self) -> &'static str {
        match self {
            Method::TokenHeuristic => "token-heuristic",
            Method::ColorReplace => "color-replace",
            Method::ThresholdMask => "threshold-mask",
        }
    }

    /// 表示用ラベルを返す。
    pub fn label(&self) -> &'static str {
        match self {
            Method::TokenHeuristic => "Token heuristic (PDF content stream)",
            Method::ColorReplace => "Exact color replacement",
            Method::ThresholdMask => "HSV threshold mask",
        }
    }

    /// 有効なセレクタ一覧を返す。
    pub fn selectors() -> Vec<&'static str> {
        METHOD_TABLE.iter().map(|(s, _)| *s).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_selectors() {
        assert_eq!(
            Method::parse("token-heuristic").unwrap(),
            Method::TokenHeuristic
        );
        assert_eq!(Method::parse("color-replace").unwrap(), Method::ColorReplace);
        assert_eq!(
            Method::parse("threshold-mask").unwrap(),
            Method::ThresholdMask
        );
    }

    #[test]
    fn test_parse_unknown_selector() {
        let err = Method::parse("magic").unwrap_err();
        assert!(matches!(
            err,
            crate::error::WatermarkError::InvalidMethod(_)
        ));
    }

    #[test]
    fn test_table_and_selectors_agree() {
        for (selector, method) in METHOD_TABLE {
            assert_eq!(method.selector(), *selector);
            assert_eq!(Method::parse(selector).unwrap(), *method);
        }
    }
}
