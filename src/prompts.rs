//! Every prompt the pipeline sends to a model.
//!
//! Prompts are written in French: the extraction contract uses French field
//! names (`valeur`, `unite`, `texte_brut`) and the report sections are French
//! headings. Stages call the builders here and never format prompt text
//! themselves, so a prompt regression is caught by the tests in this file.

use crate::language::Language;
use crate::params::NOT_FOUND_KEY;

// ── Text extraction (vision fallback) ────────────────────────────────────

/// System prompt for transcribing a scanned page image.
pub const OCR_SYSTEM_PROMPT: &str = "Tu es un moteur OCR. Transcris fidèlement tout le texte visible \
sur l'image d'une page de rapport d'analyse de sol, dans l'ordre de lecture. \
Conserve les tableaux ligne par ligne en séparant les colonnes par ' | '. \
N'ajoute aucun commentaire, aucune balise Markdown, aucune traduction.";

/// User turn accompanying the page image.
pub const OCR_USER_PROMPT: &str = "Transcris le texte de cette page.";

// ── Parameter extraction ─────────────────────────────────────────────────

/// System prompt for the parameter extraction stage.
pub const EXTRACTION_SYSTEM_PROMPT: &str = "Tu es un assistant chargé d'extraire les paramètres \
d'une analyse de sol. Tu réponds TOUJOURS avec du JSON valide.";

/// Message the model returns under `texte_brut` when nothing is found.
pub const NOT_FOUND_MESSAGE: &str = "Désolé, je n'ai pas trouvé de paramètres dans ce document";

/// User prompt asking for the parameters found in `text` as JSON.
pub fn extraction_prompt(text: &str) -> String {
    format!(
        r#"Tu dois extraire les paramètres d'analyse de sol du texte ci-dessous.
Le texte peut être structuré (tableau) ou non structuré (paragraphes).

TEXTE:
{text}

INSTRUCTIONS:
1. Cherche TOUS les paramètres de sol avec leurs valeurs numériques:
   - pH, matière organique (MO), azote (N), phosphore (P), potassium (K)
   - calcium (Ca), magnésium (Mg), sodium (Na), CEC, conductivité (CE)
   - texture (argile, limon, sable), carbone (C), C/N, etc.

2. Pour chaque paramètre trouvé:
   - Si UNE SEULE valeur: {{"valeur": "5.2", "unite": "unité"}}
   - Si PLUSIEURS valeurs: {{"valeur": "4.2, 5.1, 6.3", "unite": "unité"}}
   - Si PLAGE (min-max): {{"valeur": "4.2 - 6.3", "unite": "unité"}}
   - Toujours inclure l'unité si disponible

3. Accepte TOUTES les formes:
   - "pH = 6.5" ou "pH: 6.5" ou "le pH est de 6.5"
   - "MO 2.3%" ou "matière organique: 2.3 %"
   - "P: 12, 15, 18 ppm" (plusieurs échantillons)

4. Les paramètres secondaires peuvent être regroupés sous la clé "autres_parametres".
5. Si tu trouves au moins UN paramètre, retourne-le en JSON.
6. Si AUCUN paramètre n'est trouvé, retourne: {{"{NOT_FOUND_KEY}": "{NOT_FOUND_MESSAGE}"}}

EXEMPLE DE RÉPONSE:
{{
  "pH": {{"valeur": "5.3 - 7.7", "unite": ""}},
  "matiere_organique": {{"valeur": "0.28, 1.53", "unite": "%"}},
  "phosphore": {{"valeur": "12.5", "unite": "ppm"}},
  "potassium": {{"valeur": "0.4 - 7.0", "unite": "meq/100g"}}
}}

Réponds UNIQUEMENT avec du JSON valide, rien d'autre."#
    )
}

// ── Interpretation ───────────────────────────────────────────────────────

/// System prompt for the agronomic interpretation, written in `language`.
pub fn interpretation_system_prompt(language: Language) -> String {
    format!(
        "Tu es un agronome expert en sciences du sol. Tu maîtrises particulièrement bien les cultures \
et les sols ouest africains (Sénégal, Mali, Burkina Faso, Côte d'Ivoire, Guinée). Analyse ces \
paramètres de sol et fournis une interprétation détaillée EN {}, couvrant l'état général, \
l'analyse par paramètre (n'ignore aucun paramètre), les points forts et faiblesses, et les priorités.",
        language.prompt_name()
    )
}

/// User prompt carrying the canonical parameters as pretty JSON.
pub fn interpretation_prompt(params_json: &str) -> String {
    format!(
        r#"PARAMÈTRES DU SOL:
{params_json}

INSTRUCTIONS:
Fournis une interprétation agronomique détaillée en suivant EXACTEMENT cette structure Markdown:

### 1. État Général du Sol
- Résumé sur la santé globale du sol (pauvre, moyen, bon, excellent).
- Mentionne le principal facteur limitant (ex: acidité, manque de matière organique).

### 2. Analyse Détaillée par Paramètre (n'ignore aucun paramètre extrait)
- **pH**: Niveau et implication (acide, neutre, basique).
- **Matière Organique**: Niveau et son importance pour la fertilité.
- **Azote (N), Phosphore (P), Potassium (K)**: Niveaux individuels (faible, moyen, élevé) et équilibre N-P-K.
- **Capacité d'Échange Cationique (CEC)**: Niveau et ce que cela signifie pour la rétention des nutriments.
- **Autres paramètres**: Mentionne tout autre paramètre clé (ex: Texture, Conductivité).

### 3. Conclusion et Priorités
- **Points Forts**: Liste 2-3 aspects positifs du sol.
- **Points Faibles**: Liste 2-3 aspects négatifs à corriger.
- **Action Prioritaire**: Quelle est la chose la plus importante à faire en premier ?"#
    )
}

// ── Recommendation ───────────────────────────────────────────────────────

/// System prompt for the recommendation stage, written in `language`.
pub fn recommendation_system_prompt(language: Language) -> String {
    format!(
        "Tu es un conseiller agricole expert en sciences du sol. Tu connais particulièrement bien les \
cultures et les sols africains. Génère des recommandations EN {}: (1) Corrections du sol \
(amendements, doses), (2) Cultures recommandées (exigences, fertilisation, saison).",
        language.prompt_name()
    )
}

/// User prompt combining parameters, interpretation and retrieved context.
pub fn recommendation_prompt(params: &str, interpretation: &str, context: &str) -> String {
    format!(
        r#"CONTEXTE:
- Paramètres du sol: {params}
- Interprétation: {interpretation}
- Base de connaissances: {context}

INSTRUCTIONS:
Produis des recommandations claires et actionnables en suivant EXACTEMENT cette structure Markdown:

### 1. Corrections et Amendements du Sol
- Liste les actions correctives nécessaires. Pour chaque action, précise:
  - **Type d'amendement**: (ex: Compost, Chaux, Urée, NPK 15-15-15).
  - **Dose recommandée**: (ex: 5 t/ha, 150 kg/ha).
  - **Moment de l'application**: (ex: Avant le labour, au semis).
  - **Justification**: (ex: Pour corriger le pH acide, Pour augmenter le taux de matière organique).

### 2. Cultures Recommandées
- Propose 2 à 3 cultures adaptées au sol et au contexte. Pour chaque culture, fournis une fiche concise:
  - **Nom de la culture**: (ex: Maïs).
  - **Justification du choix**: (ex: Tolérant au pH légèrement acide, besoin en potassium modéré).
  - **Recommandations de fertilisation spécifiques**: (ex: NPK: 120-60-60 kg/ha, apport de 3 t/ha de compost).
  - **Conseils pratiques**: (ex: Semis en début de saison des pluies, espacement de 75cm x 25cm)."#
    )
}

// ── Regional summaries ───────────────────────────────────────────────────

const WOLOF_SUMMARY_PROMPT: &str = "Tu es un ingénieur agronome expérimenté et expert en sciences du sol \
qui résume des rapports pour des agriculteurs sénégalais (niveau d'éducation bas ou analphabète). \
Résume le texte suivant en WOLOF de manière simple et directe. \
Concentre-toi sur les points clés: (1) l'état du sol, (2) les problèmes, (3) les actions à faire. \
Utilise des phrases courtes et des mots comme: 'Sól si' (ce sol), 'li ci nekk' (ce qu'il y a dedans), \
'li wàcc' (ce qu'il faut faire).";

const BAMBARA_SUMMARY_PROMPT: &str = "Tu es un ingénieur agronome expérimenté et expert en sciences du sol \
qui résume des rapports pour des agriculteurs maliens (niveau d'éducation bas ou analphabète). \
Résume le texte suivant en BAMBARA de manière simple et directe. \
Concentre-toi sur les points clés: (1) l'état du sol, (2) les problèmes, (3) les actions à faire. \
Utilise des phrases courtes et des mots comme: 'Dugukolo ni' (ce sol), 'a kɔnɔna' (ce qu'il contient), \
'min ka kan ka kɛ' (ce qu'il faut faire).";

/// System prompt for a regional summary. `None` for languages without one.
pub fn summary_system_prompt(language: Language) -> Option<&'static str> {
    match language {
        Language::Wo => Some(WOLOF_SUMMARY_PROMPT),
        Language::Bm => Some(BAMBARA_SUMMARY_PROMPT),
        Language::Fr => None,
    }
}

/// User prompt wrapping the text to summarise.
pub fn summary_prompt(text: &str, language: Language) -> String {
    format!(
        "TEXTE À RÉSUMER:\n---\n{text}\n---\n\nRÉSUMÉ CONCIS EN {}:",
        language.code().to_uppercase()
    )
}
