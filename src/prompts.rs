//! Instruction templates sent to the model.
//!
//! Every prompt lives here so wording changes never touch pass logic, and so
//! tests can inspect them without a model. The sheet is Japanese, so are the
//! prompts; each one tells the model to answer with the Failed literal
//! (`取得失敗`) when it cannot find the information, which
//! [`crate::cell::Cell::from_response`] then reads as a sentinel.

use crate::cell::FAILED;

/// Organization name from the text of the first pages.
pub const ORG_NAME_FROM_TEXT: &str = "以下は統合報告書の最初の数ページです。
この中から「会社名」を 1 行で抽出してください。

- 「株式会社○○」「○○株式会社」形式が多い
- 出力には法人格（株式会社等）を含めない
- 補足、記号、説明は不要
- 取得に失敗した場合は「取得失敗」と返す";

/// Organization name from rendered images of the first pages.
pub const ORG_NAME_FROM_IMAGES: &str = "この画像は会社の統合報告書の最初の数ページです。
表紙やロゴ、奥付から「会社名」を 1 行で抽出してください。

- 出力には法人格（株式会社等）を含めない
- 補足、記号、説明は不要
- 取得に失敗した場合は「取得失敗」と返す";

/// Value statement from the text of the first pages.
pub fn value_from_text(max_chars: usize) -> String {
    format!(
        "以下は企業の統合報告書です。
この中から企業が提示している「バリュー」「行動指針」「価値観」「行動規範」に該当する内容を{max_chars}文字以内で要約してください。

・社員がどのような行動や姿勢を求められているかを優先
・説明文、前置き、ラベルは禁止
・内容そのものだけを返す
・取得できない場合は「{FAILED}」"
    )
}

/// Value statement from rendered images of the first pages.
pub fn value_from_images(max_chars: usize) -> String {
    format!(
        "この画像は会社の統合報告書の最初の数ページです。
会社が記載しているバリュー(Value)、価値観、行動指針、行動規範などの「中身」を{max_chars}文字以内にまとめてください。

・社員に求められる姿勢・行動を優先
・説明は禁止
・ラベル（バリュー等）は不要
・取得できない場合は「{FAILED}」"
    )
}

/// Ask the model to pick the more formal of two organization-name candidates.
///
/// The answer is only accepted when it reproduces one candidate verbatim.
pub fn choose_org_name(text_candidate: &str, image_candidate: &str) -> String {
    format!(
        "同じ統合報告書から 2 通りの方法で抽出した会社名の候補があります。
より正式で正確な会社名を 1 つ選び、その候補をそのまま出力してください。

候補A: {text_candidate}
候補B: {image_candidate}

・候補の文字列を一字一句変えずに出力する
・説明、記号、ラベル（候補A 等）は不要"
    )
}

/// Ask the model to synthesise one value statement from two candidates.
pub fn merge_values(text_candidate: &str, image_candidate: &str, max_chars: usize) -> String {
    format!(
        "同じ統合報告書から抽出した企業のバリュー（価値観・行動指針）の要約が 2 つあります。
両方の内容を統合し、{max_chars}文字以内の 1 つの文章にまとめてください。

要約A: {text_candidate}
要約B: {image_candidate}

・社員に求められる姿勢・行動を優先
・説明文、前置き、ラベルは禁止
・内容そのものだけを返す
・統合できない場合は「{FAILED}」"
    )
}

/// Ask for the 4-digit securities code of a listed company.
pub fn securities_code(org_name: &str) -> String {
    format!(
        "次の会社の証券コード（4 桁の数字）を答えてください。

会社名: {org_name}

・4 桁の半角数字のみを出力する
・上場していない、または分からない場合は「{FAILED}」"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_prompts_carry_length_limit() {
        assert!(value_from_text(150).contains("150文字以内"));
        assert!(value_from_images(120).contains("120文字以内"));
        assert!(merge_values("a", "b", 150).contains("150文字以内"));
    }

    #[test]
    fn arbitration_prompt_lists_both_candidates() {
        let p = choose_org_name("トヨタ自動車", "TOYOTA");
        assert!(p.contains("候補A: トヨタ自動車"));
        assert!(p.contains("候補B: TOYOTA"));
    }

    #[test]
    fn every_prompt_names_the_failure_literal() {
        for p in [
            ORG_NAME_FROM_TEXT.to_string(),
            ORG_NAME_FROM_IMAGES.to_string(),
            value_from_text(150),
            value_from_images(150),
            securities_code("ソニーグループ"),
        ] {
            assert!(p.contains(FAILED), "missing failure literal in: {p}");
        }
    }
}
