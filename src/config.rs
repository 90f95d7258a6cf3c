//! 設定ファイル(settings.yaml)の読み込み。
//!
//! すべての項目に既定値があり、設定ファイルが無くても動作する。

use std::path::Path;

use serde::Deserialize;

use crate::container::ProcessOptions;
use crate::method::Method;
use crate::transform::content_stream::HeuristicConfig;
use crate::transform::pixel::ReplacementMap;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// 既定のメソッドセレクタ。
    pub method: String,
    /// ColorReplaceの置換マップ（順序付き）。
    pub replacements: Vec<ReplacementRule>,
    /// パス2のフォールバック削除表。
    pub fill_removals: Vec<FillRemoval>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplacementRule {
    pub from: [u8; 3],
    pub to: [u8; 3],
}

#[derive(Debug, Clone, Deserialize)]
pub struct FillRemoval {
    pub operator: String,
    pub reverse_index: usize,
}

impl Default for Settings {
    fn default() -> Self {
        let replacements = ReplacementMap::default()
            .pairs()
            .iter()
            .map(|&(from, to)| ReplacementRule { from, to })
            .collect();
        let fill_removals = HeuristicConfig::default()
            .fill_removals
            .into_iter()
            .map(|(operator, reverse_index)| FillRemoval {
                operator,
                reverse_index,
            })
            .collect();

        Settings {
            method: Method::ThresholdMask.selector().to_string(),
            replacements,
            fill_removals,
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        serde_yml::from_str(yaml).map_err(|e| {
            crate::error::WatermarkError::config(format!("Failed to parse settings YAML: {e}"))
        })
    }

    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// 設定から処理オプションを構築する。メソッドセレクタはここで検証される。
    pub fn to_options(&self) -> crate::error::Result<ProcessOptions> {
        let method = Method::parse(&self.method)?;

        let replacements = ReplacementMap::new(
            self.replacements
                .iter()
                .map(|rule| (rule.from, rule.to))
                .collect(),
        );
        let heuristic = HeuristicConfig {
            fill_removals: self
                .fill_removals
                .iter()
                .map(|fr| (fr.operator.clone(), fr.reverse_index))
                .collect(),
        };

        Ok(ProcessOptions {
            method,
            replacements,
            heuristic,
        })
    }
}

/// ディレクトリ内のsettings.yamlを自動検出して読み込む。
///
/// 存在すれば読み込み、存在しなければデフォルト設定を返す。
pub fn load_settings_in(dir: &Path) -> crate::error::Result<Settings> {
    let settings_path = dir.join("settings.yaml");

    if settings_path.exists() {
        Settings::from_file(&settings_path)
    } else {
        Ok(Settings::default())
    }
}
