//! コンテンツストリームの命令単位ヒューリスティック。
//!
//! ラスタオーバーレイではなく描画命令として埋め込まれた透かしを、
//! 3段のパスで検出して命令ごと削除する。削除は常に命令単位で行い、
//! オペランドの一部だけを消すことはない（ストリームの構文は常に保たれる）。

use std::collections::{BTreeSet, HashMap};

use lopdf::Object;
use lopdf::content::{Content, Operation};

use crate::diagnostics::Diagnostics;

/// パス1が狙う透かしフレーズ。1文字ずつのTj命令列として描画される。
const TARGET_PHRASE: &[u8] = b"VERSION EVALUATION";

/// パス3が狙うマーカー列。配列型テキスト表示の先頭がこれに一致したら削除する。
const ARRAY_MARKERS: &[&[u8]] = &[b"Trial - Build", b"Evaluation Only"];

/// フォールバックパス（パス2）の設定。
#[derive(Debug, Clone)]
pub struct HeuristicConfig {
    /// 削除するオペレータ出現: (オペレータ名, 逆順出現インデックス)。
    /// 逆順インデックス0はページ内で最後に現れるその命令を指す。
    pub fill_removals: Vec<(String, usize)>,
}

impl Default for HeuristicConfig {
    /// 既定: ページ最後のfill path命令（既知の透かしテンプレートの塗り）。
    fn default() -> Self {
        Self {
            fill_removals: vec![("f".to_string(), 0)],
        }
    }
}

/// 1ページのコンテンツストリームから透かし命令を除去し、再シリアライズする。
///
/// パスは固定順で適用される:
/// 1. 連続する単一オペランドテキスト表示命令のランをフレーズ照合で削除
/// 2. パス1が何も削除しなかった場合のみ、位置表に基づくフォールバック削除
///    （毎回警告としてログし、診断ポートへ転送する）
/// 3. 配列型テキスト表示命令のマーカー先頭一致による削除
///
/// 空の結果ストリームも有効。
pub fn strip_text_watermarks(
    content_bytes: &[u8],
    config: &HeuristicConfig,
    diagnostics: &dyn Diagnostics,
) -> crate::error::Result<Vec<u8>> {
    // 空バイト列はlopdfのパーサがエラーを返す可能性があるため特別扱い
    if content_bytes.is_empty() {
        return Ok(Vec::new());
    }

    let content = Content::decode(content_bytes)
        .map_err(|e| crate::error::WatermarkError::decode(e.to_string()))?;
    let operations: &[Operation] = content.operations.as_ref();

    let mut marked = collect_phrase_runs(operations);

    if marked.is_empty() {
        // フォールバックに頼った事実そのものを毎回報告する（削除数0でも）
        let fallback = collect_fill_removals(operations, config);
        let message = format!(
            "phrase heuristic matched nothing; fallback position table removed {} instruction(s)",
            fallback.len()
        );
        tracing::warn!(target: "watermark_removal", "{message}");
        diagnostics.report_warning(&message);
        marked.extend(fallback);
    }

    marked.extend(collect_marked_array_shows(operations));

    // 2段階の書き換え: 削除インデックス集合を先に確定し、生存命令を1パスで構築する
    let survivors: Vec<Operation> = operations
        .iter()
        .enumerate()
        .filter(|(i, _)| !marked.contains(i))
        .map(|(_, op)| op.clone())
        .collect();

    Content {
        operations: survivors,
    }
    .encode()
    .map_err(|e| crate::error::WatermarkError::encode(e.to_string()))
}

/// 単一オペランドのテキスト表示命令なら、そのテキストバイト列を返す。
fn show_text_operand(op: &Operation) -> Option<&[u8]> {
    if !matches!(op.operator.as_str(), "Tj" | "'") || op.operands.len() != 1 {
        return None;
    }
    match &op.operands[0] {
        Object::String(bytes, _) => Some(bytes),
        _ => None,
    }
}

/// パス1: 連続するテキスト表示命令のランを連結してフレーズ照合する。
///
/// 連結がフレーズの前方一致である限りランを伸ばし、完全一致した時点で
/// ラン全体を削除対象にする。前方一致が崩れた命令はラン先頭候補として
/// 再試行し、テキスト表示以外の命令はランをリセットする。
fn collect_phrase_runs(operations: &[Operation]) -> BTreeSet<usize> {
    let mut marked = BTreeSet::new();
    let mut run: Vec<usize> = Vec::new();
    let mut accumulated: Vec<u8> = Vec::new();

    for (i, op) in operations.iter().enumerate() {
        let Some(text) = show_text_operand(op) else {
            run.clear();
            accumulated.clear();
            continue;
        };

        accumulated.extend_from_slice(text);
        if TARGET_PHRASE.starts_with(&accumulated) {
            run.push(i);
        } else {
            // 前方一致が崩れた: リセットし、この命令を新しいランの先頭として再試行
            run.clear();
            accumulated.clear();
            if TARGET_PHRASE.starts_with(text) {
                accumulated.extend_from_slice(text);
                run.push(i);
            }
        }

        if accumulated.len() == TARGET_PHRASE.len() {
            marked.extend(run.drain(..));
            accumulated.clear();
        }
    }

    marked
}

/// パス2: 逆順走査でオペレータごとの出現カウンタを維持し、
/// 設定表にある (オペレータ, 逆順インデックス) の出現を削除対象にする。
fn collect_fill_removals(operations: &[Operation], config: &HeuristicConfig) -> BTreeSet<usize> {
    let mut marked = BTreeSet::new();
    let mut counters: HashMap<&str, usize> = HashMap::new();

    for (i, op) in operations.iter().enumerate().rev() {
        let counter = counters.entry(op.operator.as_str()).or_insert(0);
        let reverse_index = *counter;
        *counter += 1;

        let hit = config
            .fill_removals
            .iter()
            .any(|(operator, rev)| operator == &op.operator && *rev == reverse_index);
        if hit {
            marked.insert(i);
        }
    }

    marked
}

/// パス3: 配列型テキスト表示命令の表示内容を2通りの候補列として復元し、
/// どちらかがマーカー列のいずれかで始まるなら命令を削除対象にする。
///
/// 候補A: 文字列オペランドのバイト列をそのまま連結したもの。
/// 候補B: 各バイトを1文字として復号し直したもの（非ASCIIで候補Aと異なる）。
/// 数値（カーニング）以外に文字列でもないオペランドを含む命令は削除しない。
fn collect_marked_array_shows(operations: &[Operation]) -> BTreeSet<usize> {
    let mut marked = BTreeSet::new();

    for (i, op) in operations.iter().enumerate() {
        if op.operator != "TJ" || op.operands.len() != 1 {
            continue;
        }
        let Object::Array(items) = &op.operands[0] else {
            continue;
        };

        let mut joined_bytes: Vec<u8> = Vec::new();
        let mut decoded_chars = String::new();
        let mut deletable = true;

        for item in items {
            match item {
                Object::String(bytes, _) => {
                    joined_bytes.extend_from_slice(bytes);
                    for &b in bytes {
                        decoded_chars.push(b as char);
                    }
                }
                Object::Integer(_) | Object::Real(_) => {}
                _ => {
                    deletable = false;
                    break;
                }
            }
        }

        if !deletable {
            continue;
        }

        let matches_marker = ARRAY_MARKERS.iter().any(|marker| {
            joined_bytes.starts_with(marker) || decoded_chars.as_bytes().starts_with(marker)
        });
        if matches_marker {
            marked.insert(i);
        }
    }

    marked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tj(text: &str) -> Operation {
        Operation::new(
            "Tj",
            vec![Object::string_literal(text.as_bytes().to_vec())],
        )
    }

    #[test]
    fn test_phrase_run_single_instruction() {
        let ops = vec![tj("VERSION EVALUATION")];
        let marked = collect_phrase_runs(&ops);
        assert_eq!(marked.into_iter().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_phrase_run_restarts_after_break() {
        // 崩れた直後の命令が新しいランの先頭になりうる
        let ops = vec![tj("VERSION "), tj("X"), tj("VERSION EVALUATION")];
        let marked = collect_phrase_runs(&ops);
        assert_eq!(marked.into_iter().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_fill_removal_reverse_index() {
        let config = HeuristicConfig::default();
        let ops = vec![
            Operation::new("f", vec![]),
            Operation::new("S", vec![]),
            Operation::new("f", vec![]),
        ];
        let marked = collect_fill_removals(&ops, &config);
        // 逆順インデックス0 = 最後のf
        assert_eq!(marked.into_iter().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_array_show_non_text_operand_not_deletable() {
        let items = vec![
            Object::string_literal(b"Trial - Build 4".to_vec()),
            Object::Name(b"Odd".to_vec()),
        ];
        let ops = vec![Operation::new("TJ", vec![Object::Array(items)])];
        let marked = collect_marked_array_shows(&ops);
        assert!(marked.is_empty());
    }
}
