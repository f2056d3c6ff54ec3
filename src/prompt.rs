//! Prompt construction for style transformations
//!
//! A prompt is an instruction block in the target language followed by an
//! example block carrying the user's text. Nothing here performs I/O.

use crate::language::{detect_language, Language};
use crate::model::{Conversion, OutputLanguage, StyleConfig};

/// Description used when a custom style arrives without one
pub const DEFAULT_CUSTOM_DESCRIPTION: &str = "A custom writing style defined by the user";

/// Key of the entry unknown style keys resolve to
pub const FALLBACK_STYLE: &str = "chat";

/// A built-in transformation preset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinStyle {
    pub key: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
}

pub const BUILTIN_STYLES: &[BuiltinStyle] = &[
    BuiltinStyle {
        key: "chat",
        display_name: "Casual Chat",
        description: "Relaxed, friendly everyday conversation",
    },
    BuiltinStyle {
        key: "formal",
        display_name: "Formal",
        description: "Polite, professional and well-structured",
    },
    BuiltinStyle {
        key: "poem",
        display_name: "Poetic",
        description: "Lyrical, rhythmic language rich in imagery",
    },
    BuiltinStyle {
        key: "humor",
        display_name: "Humorous",
        description: "Playful and witty with light-hearted jokes",
    },
    BuiltinStyle {
        key: "gentle",
        display_name: "Gentle",
        description: "Warm, soft and considerate",
    },
    BuiltinStyle {
        key: "academic",
        display_name: "Academic",
        description: "Precise, objective scholarly prose",
    },
    BuiltinStyle {
        key: "business",
        display_name: "Business",
        description: "Concise, results-oriented workplace communication",
    },
    BuiltinStyle {
        key: "literary",
        display_name: "Literary",
        description: "Elegant prose with refined vocabulary",
    },
    BuiltinStyle {
        key: "internet",
        display_name: "Internet Slang",
        description: "Trendy online expressions and memes",
    },
    BuiltinStyle {
        key: "classical",
        display_name: "Classical",
        description: "Old-fashioned, classical phrasing",
    },
];

/// Resolves a style key against the built-in table, falling back to "chat"
pub fn builtin_style(key: &str) -> &'static BuiltinStyle {
    BUILTIN_STYLES
        .iter()
        .find(|style| style.key == key)
        .or_else(|| BUILTIN_STYLES.iter().find(|style| style.key == FALLBACK_STYLE))
        .unwrap_or(&BUILTIN_STYLES[0])
}

/// Language the prompt and the generated text will use
pub fn resolve_language(text: &str, output: OutputLanguage) -> Language {
    match output {
        OutputLanguage::Auto => detect_language(text),
        OutputLanguage::Fixed(lang) => lang,
    }
}

struct Template {
    intro: &'static str,
    description_label: &'static str,
    requirements_label: &'static str,
    requirements: [&'static str; 5],
    output_only: &'static str,
    original_label: &'static str,
    rewritten_label: &'static str,
}

fn template(lang: Language) -> &'static Template {
    match lang {
        Language::En => &EN,
        Language::Zh => &ZH,
        Language::Ja => &JA,
        Language::De => &DE,
        Language::Es => &ES,
    }
}

const EN: Template = Template {
    intro: "Please rewrite the following text in the \"{name}\" style.",
    description_label: "Style description: ",
    requirements_label: "Requirements:",
    requirements: [
        "Preserve the original meaning and key information",
        "Match the tone and characteristics of the target style",
        "Keep the wording natural and fluent",
        "Keep the length reasonable and close to the original",
        "The output must be written in English",
    ],
    output_only: "Return only the rewritten text without any explanation.",
    original_label: "Original text: ",
    rewritten_label: "Rewritten text:",
};

const ZH: Template = Template {
    intro: "请将以下文本改写为「{name}」风格。",
    description_label: "风格说明：",
    requirements_label: "要求：",
    requirements: [
        "保持原文的核心意思和关键信息",
        "符合目标风格的语气和特点",
        "语言自然流畅",
        "长度适中，与原文相近",
        "必须使用中文输出",
    ],
    output_only: "只输出改写后的文本，不要任何解释。",
    original_label: "原文：",
    rewritten_label: "改写：",
};

const JA: Template = Template {
    intro: "以下のテキストを「{name}」のスタイルに書き換えてください。",
    description_label: "スタイルの説明：",
    requirements_label: "要件：",
    requirements: [
        "原文の意味と重要な情報を保つこと",
        "目標スタイルの口調と特徴に合わせること",
        "自然で流暢な表現にすること",
        "長さは原文に近い適度なものにすること",
        "必ず日本語で出力すること",
    ],
    output_only: "書き換えたテキストのみを出力し、説明は不要です。",
    original_label: "原文：",
    rewritten_label: "書き換え：",
};

const DE: Template = Template {
    intro: "Bitte schreibe den folgenden Text im Stil „{name}“ um.",
    description_label: "Stilbeschreibung: ",
    requirements_label: "Anforderungen:",
    requirements: [
        "Die ursprüngliche Bedeutung und wichtige Informationen beibehalten",
        "Ton und Merkmale des Zielstils treffen",
        "Natürlich und flüssig formulieren",
        "Eine angemessene Länge ähnlich dem Original einhalten",
        "Die Ausgabe muss auf Deutsch sein",
    ],
    output_only: "Gib nur den umgeschriebenen Text ohne Erklärungen aus.",
    original_label: "Originaltext: ",
    rewritten_label: "Umgeschriebener Text:",
};

const ES: Template = Template {
    intro: "Reescribe el siguiente texto con el estilo «{name}».",
    description_label: "Descripción del estilo: ",
    requirements_label: "Requisitos:",
    requirements: [
        "Conservar el significado original y la información clave",
        "Ajustarse al tono y las características del estilo objetivo",
        "Mantener un lenguaje natural y fluido",
        "Mantener una longitud razonable, similar al original",
        "La salida debe estar en español",
    ],
    output_only: "Devuelve solo el texto reescrito, sin explicaciones.",
    original_label: "Texto original: ",
    rewritten_label: "Texto reescrito:",
};

/// Builds the full instruction + example prompt for one request
///
/// `Conversion::Style` keys that are not in [`BUILTIN_STYLES`] use the
/// "chat" entry. A custom style's `prompt_template`, when present, replaces
/// the generated style line verbatim.
pub fn build_prompt(text: &str, conversion: &Conversion, output: OutputLanguage) -> String {
    let lang = resolve_language(text, output);
    let tpl = template(lang);

    let style_block = match conversion {
        Conversion::Style(key) => {
            let style = builtin_style(key);
            style_line(tpl, style.display_name, style.description)
        }
        Conversion::CustomStyle(config) => custom_style_block(tpl, config),
    };

    let mut prompt = String::with_capacity(style_block.len() + text.len() + 512);
    prompt.push_str(&style_block);
    prompt.push_str("\n\n");
    prompt.push_str(tpl.requirements_label);
    prompt.push('\n');
    for (i, requirement) in tpl.requirements.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, requirement));
    }
    prompt.push('\n');
    prompt.push_str(tpl.output_only);
    prompt.push_str("\n\n");
    prompt.push_str(tpl.original_label);
    prompt.push_str(text);
    prompt.push('\n');
    prompt.push_str(tpl.rewritten_label);
    prompt
}

fn style_line(tpl: &Template, name: &str, description: &str) -> String {
    format!(
        "{}\n{}{}",
        tpl.intro.replace("{name}", name),
        tpl.description_label,
        description
    )
}

fn custom_style_block(tpl: &Template, config: &StyleConfig) -> String {
    match config.prompt_template.as_deref().map(str::trim) {
        Some(custom) if !custom.is_empty() => custom.to_string(),
        _ => {
            let description = config
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .unwrap_or(DEFAULT_CUSTOM_DESCRIPTION);
            style_line(tpl, &config.display_name, description)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom(template: Option<&str>, description: Option<&str>) -> Conversion {
        Conversion::CustomStyle(StyleConfig {
            id: Some("c1".to_string()),
            display_name: "Pirate".to_string(),
            description: description.map(str::to_string),
            prompt_template: template.map(str::to_string),
        })
    }

    #[test]
    fn unknown_style_uses_chat_entry() {
        assert_eq!(builtin_style("does-not-exist").key, "chat");

        let prompt = build_prompt(
            "hello",
            &Conversion::Style("does-not-exist".to_string()),
            OutputLanguage::Fixed(Language::En),
        );
        assert!(prompt.contains("\"Casual Chat\""));
    }

    #[test]
    fn english_prompt_has_requirements_and_example() {
        let prompt = build_prompt(
            "Hello world",
            &Conversion::Style("poem".to_string()),
            OutputLanguage::Fixed(Language::En),
        );

        assert!(prompt.starts_with("Please rewrite the following text in the \"Poetic\" style."));
        assert!(prompt.contains("Style description: Lyrical"));
        for n in 1..=5 {
            assert!(prompt.contains(&format!("\n{}. ", n)));
        }
        assert!(prompt.contains("The output must be written in English"));
        assert!(prompt.ends_with("Original text: Hello world\nRewritten text:"));
    }

    #[test]
    fn auto_language_follows_detected_input() {
        let prompt = build_prompt(
            "今天天气很好",
            &Conversion::Style("formal".to_string()),
            OutputLanguage::Auto,
        );
        assert!(prompt.starts_with("请将以下文本改写为「Formal」风格。"));
        assert!(prompt.contains("必须使用中文输出"));

        let prompt = build_prompt(
            "こんにちは",
            &Conversion::Style("formal".to_string()),
            OutputLanguage::Auto,
        );
        assert!(prompt.contains("必ず日本語で出力すること"));
    }

    #[test]
    fn fixed_language_overrides_input_script() {
        let prompt = build_prompt(
            "Hello",
            &Conversion::Style("chat".to_string()),
            OutputLanguage::Fixed(Language::De),
        );
        assert!(prompt.contains("Die Ausgabe muss auf Deutsch sein"));
        assert!(prompt.ends_with("Originaltext: Hello\nUmgeschriebener Text:"));
    }

    #[test]
    fn custom_template_is_used_verbatim() {
        let prompt = build_prompt(
            "Hi there",
            &custom(Some("Talk like a pirate, matey."), None),
            OutputLanguage::Fixed(Language::Es),
        );
        assert!(prompt.starts_with("Talk like a pirate, matey.\n\nRequisitos:"));
        assert!(prompt.contains("Texto original: Hi there"));
    }

    #[test]
    fn custom_style_without_description_gets_placeholder() {
        let prompt = build_prompt(
            "Hi",
            &custom(None, None),
            OutputLanguage::Fixed(Language::En),
        );
        assert!(prompt.contains("\"Pirate\""));
        assert!(prompt.contains(DEFAULT_CUSTOM_DESCRIPTION));

        let blank = build_prompt(
            "Hi",
            &custom(Some("   "), Some("Arr")),
            OutputLanguage::Fixed(Language::En),
        );
        assert!(blank.contains("Style description: Arr"));
    }
}
