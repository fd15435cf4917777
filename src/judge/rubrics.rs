//! Fixed natural-language rubrics for every [`Metric`].

use super::Metric;

pub struct Rubric {
    pub criteria: &'static str,
    pub steps: &'static [&'static str],
    /// Whether the case's context tag (e.g. a localization map) is shown to the judge.
    pub uses_context: bool,
}

/// Score bands shared by all rubrics, on the 0-10 scale the judge answers in.
pub const SCORE_BANDS: &str = "0-4: Subpar; 5-6: Marginal; 7-8: Good; 9-10: Excellent";

static FACTUAL_FIDELITY: Rubric = Rubric {
    criteria: "Every claim in the actual output must be supported by the retrieval context. \
Figures, names, dates and causal statements must match the source exactly.",
    steps: &[
        "List the factual claims made in the actual output.",
        "For each claim, find the supporting passage in the retrieval context.",
        "Penalize any claim that is contradicted by, or absent from, the retrieval context.",
        "Score by the share of claims that are fully supported.",
    ],
    uses_context: false,
};

static CONTENT_RELEVANCE: Rubric = Rubric {
    criteria: "The actual output must carry the most material information of the input \
for an investment audience: the corporate development, its figures, and its consequence.",
    steps: &[
        "Identify the most material developments in the input.",
        "Check that the actual output covers them before any secondary detail.",
        "Penalize filler, background, or trivia that displaces material facts.",
    ],
    uses_context: false,
};

static TONE_AND_GRAMMAR: Rubric = Rubric {
    criteria: "The actual output must read like professional Malaysian equity research: \
formal, objective, neutral, and grammatically clean. No slang, contractions, emojis, \
speculation, or promotional or emotionally charged language.",
    steps: &[
        "Scan for casual expressions, filler phrases, and unnecessary contractions.",
        "Check that the tone is objective rather than speculative or promotional.",
        "Check grammar, sentence structure and formatting consistency.",
        "Check localized financial formatting such as 'RM', 'bn' and 'm'.",
        "Quotes about corporate actions may be informal; promotional quotes are a significant penalty.",
    ],
    uses_context: false,
};

static EXECUTIVE_WRITING: Rubric = Rubric {
    criteria: "The actual output must suit a senior investment professional: 3 to 6 sentences, \
the most material development in the opening sentence, precise figures (RM, %, bn, m) \
preferred over adjectives, and no promotional language.",
    steps: &[
        "Check that the opening sentence delivers the key news without background filler.",
        "Check that each sentence is impactful and unambiguous.",
        "Penalize outputs below 3 or above 6 sentences.",
        "Penalize promotional language or emotional quotes.",
    ],
    uses_context: false,
};

static TRANSLATION_COMPLETENESS: Rubric = Rubric {
    criteria: "The actual output must be an accurate and complete translation of the input: \
full semantic meaning preserved, no omitted facts, figures or qualifiers, and nothing added.",
    steps: &[
        "Compare the actual output to the input sentence by sentence.",
        "Verify every fact, figure and nuance of the input is present.",
        "Identify any content in the actual output that is not in the input.",
        "Check for shifts in meaning or mistranslated phrases.",
    ],
    uses_context: false,
};

static ENTITY_LOCALIZATION: Rubric = Rubric {
    criteria: "Financial entities in the translation must be localized for professionals in \
the target language: tickers and identifiers kept verbatim, institutions and acronyms in \
their accepted local form, jargon in its standard local equivalent, currencies in local \
convention. Terms in a provided localization map must be used exactly as mapped.",
    steps: &[
        "Identify tickers, currency amounts, institutional acronyms and jargon in the input.",
        "Verify tickers and identifiers are unchanged in the actual output.",
        "Verify acronyms, institutions and jargon use the accepted local form.",
        "Verify currency symbols and amounts are correct and naturally formatted.",
        "If the context holds a localization map, verify every mapped term is used exactly.",
    ],
    uses_context: true,
};

static COHERENCE_AND_FLOW: Rubric = Rubric {
    criteria: "The actual output must follow the hierarchy of a daily news watch summary: a \
definitive lead sentence with the primary development, then supporting data and strategic \
context, ideally a quote conveying material strategic facts. Key point then substantiation, \
not chronological storytelling.",
    steps: &[
        "Verify the opening sentence holds the most material financial news.",
        "Assess whether supporting sentences descend logically from impact to detail.",
        "Penalize jumbled, contradictory or disjointed ordering.",
        "Ignore tone and factual precision; judge structure and flow only.",
    ],
    uses_context: false,
};

pub fn for_metric(metric: Metric) -> &'static Rubric {
    match metric {
        Metric::FactualFidelity => &FACTUAL_FIDELITY,
        Metric::ContentRelevance => &CONTENT_RELEVANCE,
        Metric::ToneAndGrammar => &TONE_AND_GRAMMAR,
        Metric::ExecutiveWritingQuality => &EXECUTIVE_WRITING,
        Metric::TranslationCompleteness => &TRANSLATION_COMPLETENESS,
        Metric::EntityLocalization => &ENTITY_LOCALIZATION,
        Metric::CoherenceAndFlow => &COHERENCE_AND_FLOW,
    }
}
