//! Prompt templates for composition grading.

use std::fmt::Write as _;

use crate::domain::exam::{ExamSettings, ExamType, ProblemType};

const PLAIN_TEXT_RULES: &str = "\
JSON以外の文章は出力しないでください。
説明文にはMarkdown記号（*, #, - など）を使わず、プレーンテキストで書いてください。
英単語を不要な引用符で囲まないでください。";

const CORRECTION_SCHEMA: &str = r#"  "corrections": [
    {
      "original": "修正前の箇所",
      "fixed": "修正後の表現",
      "type": "Grammar" | "Vocabulary" | "Structure" | "Content",
      "explanation": "日本語での解説"
    }
  ],
  "advice": "日本語での全体アドバイス",
  "model_answer": "模範解答""#;

fn university_context(settings: &ExamSettings) -> String {
    match settings.university_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => format!("志望校: {name}"),
        _ => "難関国公立・私立大学レベル".to_owned(),
    }
}

fn score_schema(exam_type: ExamType) -> String {
    let max = exam_type.criterion_max();
    let total = exam_type.total_max();
    format!(
        r#"  "score": {{
    "content": 0から{max}の整数,
    "structure": 0から{max}の整数,
    "vocabulary": 0から{max}の整数,
    "grammar": 0から{max}の整数,
    "total": 0から{total}の整数
  }},
  "is_passing_level": 合格圏内なら true"#
    )
}

/// One-line persona for quick scoring.
pub fn role_context(settings: &ExamSettings) -> String {
    match settings.exam_type {
        ExamType::University => format!(
            "あなたは日本の大学入試（{}）の英作文を採点する専門の採点官です。",
            university_context(settings)
        ),
        ExamType::Eiken => format!(
            "あなたは英検{}ライティングの採点官です。",
            settings.level.label()
        ),
    }
}

/// Transcription plus quick scoring from one or two images.
pub fn basic_prompt(settings: &ExamSettings) -> String {
    let exam_type = settings.exam_type;
    format!(
        "# Role
{role}

# Task
手書きの英作文の画像を読み取り、次の処理を手早く行ってください。
1. 文字起こし: 手書きの英文をそのままテキストにしてください。スペルミスも直さずに読み取ります。
   問題文が写っていて語数制限（例: 80〜100語）が書かれていれば、その値も読み取ってください。
2. 概略採点: 内容・構成・語彙・文法の4観点を各{max}点満点で採点してください。

# Output (JSON only)
{rules}
{{
  \"transcribed_text\": \"読み取った英文\",
  \"topic_recognition\": \"読み取れたトピックや問題の内容（日本語、空でも可）\",
  \"detected_word_limit\": \"読み取った語数制限（例: '80-100'）、無ければ null\",
{score}
}}
",
        role = role_context(settings),
        max = exam_type.criterion_max(),
        rules = PLAIN_TEXT_RULES,
        score = score_schema(exam_type),
    )
}

/// Corrections, advice, and a model answer for transcribed text.
pub fn detail_prompt(settings: &ExamSettings, transcribed_text: &str) -> String {
    let (persona, criteria, length_rule) = match settings.exam_type {
        ExamType::University => (
            format!(
                "あなたは予備校のベテラン英語講師です。{}の合格を目指す生徒を厳しく指導してください。",
                university_context(settings)
            ),
            "大学入試の採点基準".to_owned(),
            String::new(),
        ),
        ExamType::Eiken => {
            let label = settings.level.label();
            let length_rule = match settings.word_limit.as_deref().map(str::trim) {
                Some(limit) if !limit.is_empty() => {
                    format!("（語数制限 {limit} 語程度を必ず守ってください）")
                }
                _ => format!("（英検{label}の標準的な語数を必ず守ってください）"),
            };
            (
                format!("あなたは英検{label}のプロの採点官であり英語教師です。"),
                format!("英検{label}の採点基準"),
                length_rule,
            )
        }
    };

    format!(
        "# Role
{persona}

# Input
受験者の英作文:
\"\"\"
{transcribed_text}
\"\"\"

# Task
{criteria}に基づいて詳しく添削してください。
1. 添削: 文法ミス、不自然なコロケーション、より良い言い換えを指摘し、理由を日本語で説明してください。
2. アドバイス: 合格に向けた具体的な学習アドバイスを書いてください。
3. 模範解答: 受験者の英文をもとに、添削内容を反映して書き直してください。ゼロから書き直さず、本来書きたかった内容を磨く形にしてください。{length_rule}

# Output (JSON only)
{rules}
{{
{corrections}
}}
",
        rules = PLAIN_TEXT_RULES,
        corrections = CORRECTION_SCHEMA,
    )
}

fn level_emphasis(settings: &ExamSettings) -> &'static str {
    if settings.level.is_foundation() {
        "難しい単語よりも、基本的な文法ミスが無いことを重視して採点してください。"
    } else if settings.level.is_advanced() {
        "単調な表現を避け、高度な語彙や多様な構文を使えているかを厳しく評価してください。"
    } else {
        ""
    }
}

fn image_description(image_count: usize) -> &'static str {
    if image_count >= 2 {
        "画像は2枚です。1枚目は問題文（TOPICやPOINTS）、2枚目は受験者の手書き解答です。"
    } else {
        "画像は1枚で、受験者の手書き解答です。問題文は無いので、解答から課題を推測して採点してください。"
    }
}

fn summary_word_range(settings: &ExamSettings) -> &'static str {
    match settings.level.code() {
        "2" => "45〜55語",
        "pre-1" => "60〜70語",
        _ => "指定された語数",
    }
}

fn eiken_criteria(settings: &ExamSettings) -> (String, String) {
    let label = settings.level.label();
    let emphasis = level_emphasis(settings);
    match settings.problem_type {
        ProblemType::Summary => (
            format!(
                "あなたは英検{label}の採点官です。要約問題を採点します。要約として適切かを最も重視してください。\n{emphasis}"
            ),
            format!(
                "要約問題の基準（各0〜4点、合計16点）で採点してください。
- 内容: 主旨と重要な詳細が過不足なく含まれているか。
- 構成: 論理的な流れがあり、接続表現が効果的か。
- 語彙: 原文の丸写しではなく、自分の言葉で言い換えているか。
- 文法: 文構造の正確さと多様さ。語数（{range}程度）から大きく外れていれば減点してください。",
                range = summary_word_range(settings)
            ),
        ),
        ProblemType::Email => (
            format!(
                "あなたは英検{label}の採点官です。Eメール返信問題を採点します。相手のメールに適切に返信できているかを重視してください。\n{emphasis}"
            ),
            "Eメール問題の基準（各0〜4点、合計16点）で採点してください。
- 内容: 相手の質問すべてに明確に答えているか。
- 構成: 挨拶・本文・結びの形式が整い、文のつながりが自然か。
- 語彙: メールにふさわしい表現を使えているか。
- 文法: 文法の正確さと多様さ。"
                .to_owned(),
        ),
        ProblemType::Opinion if settings.level.code() == "pre-2-plus" => (
            "あなたは英検準2級プラスの採点官であり、生徒を合格に導く英語教師です。意見論述問題を採点します。論理構成と語数を特に重視してください。"
                .to_owned(),
            "準2級プラスの基準（各0〜4点、合計16点）で採点してください。
- 内容: 意見と、それを支える2つの理由が明確か。
- 構成: 意見、理由1、理由2、結論の流れがあり、つながりが自然か。
- 語彙: 準2級より一段高い語彙や適切な接続表現を使えているか。
- 文法: 正確さに加えて多様な文構造があるか。語数の目安（50〜60語）から大きく外れていないか。"
                .to_owned(),
        ),
        ProblemType::Opinion => (
            format!(
                "あなたは英検{label}の採点官であり、生徒を合格に導く英語教師です。{label}ライティングの採点基準を熟知しています。\n{emphasis}"
            ),
            "意見論述の基準（各0〜4点、合計16点）で採点してください。
- 内容: 求められた内容があり、意見と理由が明確か。
- 構成: 流れが分かりやすく論理的か。接続表現が適切か。
- 語彙: 課題にふさわしい語彙を正しく使えているか。
- 文法: 文構造のバリエーションと正確さ。"
                .to_owned(),
        ),
    }
}

fn university_full_prompt(settings: &ExamSettings) -> String {
    let limit = match settings.word_limit.as_deref().map(str::trim) {
        Some(limit) if !limit.is_empty() => format!("指定語数: {limit} words"),
        _ => "語数指定なし".to_owned(),
    };
    format!(
        "# Role
あなたは難関大学の入試英語を知り尽くした予備校のベテラン英語講師です。
大学入試の基準で答案を厳しく添削し、合格レベルへ引き上げてください。{context}の対策として指導してください。

# Input
画像は1枚または2枚です。2枚の場合、1枚目は問題文（自由英作文または和文英訳）、2枚目は手書きの解答です。
1枚の場合は解答から課題を推測してください。
{limit}

# Task
1. 出題形式の特定: 自由英作文か和文英訳かを判断してください。和文英訳では原文のニュアンス、自由英作文では論理と説得力を最重視します。
2. 文字起こし: 解答をそのままテキストにしてください。スペルミスも直しません。
3. 採点: 内容・構成・語彙・文法を各10点、合計40点で採点してください。英検より論理性と硬い表現を厳しく見てください。
4. 添削: 減点されない英語と加点される英語の両面から指摘してください。
5. 模範解答: その大学で満点が取れる水準の解答を書いてください。

# Output (JSON only)
{rules}
{{
  \"transcribed_text\": \"読み取った英文\",
  \"topic_recognition\": \"出題形式とテーマ\",
{score},
{corrections}
}}
",
        context = university_context(settings),
        rules = PLAIN_TEXT_RULES,
        score = score_schema(ExamType::University),
        corrections = CORRECTION_SCHEMA,
    )
}

/// Full analysis from one or two images.
pub fn full_prompt(settings: &ExamSettings, image_count: usize) -> String {
    if settings.exam_type == ExamType::University {
        return university_full_prompt(settings);
    }

    let (persona, criteria) = eiken_criteria(settings);
    let label = settings.level.label();
    let mut prompt = format!(
        "# Role
{persona}

# Input
{images}

# Task
1. 文字起こし: 手書きの解答を正確にテキストにしてください。スペルミスも直さずに読み取ります。
2. 採点: {criteria}
3. 添削: 文全体ではなく誤っている箇所だけを指摘し、理由と改善策を日本語で説明してください。
",
        persona = persona.trim_end(),
        images = image_description(image_count),
    );
    if settings.problem_type == ProblemType::Summary {
        prompt.push_str("   要約では原文の丸写しになっていないかを確認し、言い換え案も示してください。\n");
    }
    let _ = write!(
        prompt,
        "4. フィードバック: 合格ラインに達しているかと全体的なアドバイスを、励ましの言葉を添えて書いてください。
5. 模範解答: {label}として満点となる模範解答を書いてください。

# Output (JSON only)
{rules}
{{
  \"transcribed_text\": \"読み取った英文\",
  \"topic_recognition\": \"読み取れたトピック（空でも可）\",
{score},
{corrections}
}}
",
        rules = PLAIN_TEXT_RULES,
        score = score_schema(ExamType::Eiken),
        corrections = CORRECTION_SCHEMA,
    );
    prompt
}
