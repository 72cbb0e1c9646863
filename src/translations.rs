//! Localised strings for the report and the parameter table.
//!
//! Lookups fall back from the requested language to French and from French
//! to the key itself, so a missing entry degrades to something readable
//! instead of failing the report.

use crate::language::Language;
use crate::params::key::title_case;

type Table = &'static [(&'static str, &'static str)];

const FR: Table = &[
    ("report_title", "RAPPORT D'ANALYSE DE SOL"),
    ("analysis_time", "Temps d'analyse"),
    ("parameters_title", "Paramètres extraits"),
    ("interpretation_title", "Interprétation agronomique"),
    ("recommendations_title", "Recommandations et cultures adaptées"),
    ("parameter", "Paramètre"),
    ("value", "Valeur"),
    ("unit", "Unité"),
    ("extraction_failed", "Extraction impossible"),
    ("no_parameters", "Aucun paramètre extrait"),
    ("summary_failed", "Erreur lors de la génération du résumé {lang}."),
    ("no_knowledge", "Aucun document disponible."),
    ("summary_unavailable", "Résumé {lang} non disponible."),
    ("timing_ocr", "OCR"),
    ("timing_extraction", "Extraction"),
    ("timing_analysis", "Analyse"),
    ("timing_recommendations", "Recommandations"),
    ("ph", "pH"),
    ("matiere_organique", "Matière organique"),
    ("azote_total", "Azote total"),
    ("phosphore", "Phosphore"),
    ("potassium", "Potassium"),
    ("calcium", "Calcium"),
    ("magnesium", "Magnésium"),
    ("sodium", "Sodium"),
    ("cec", "Capacité d'échange cationique"),
    ("conductivite_electrique", "Conductivité électrique"),
    ("carbone_organique", "Carbone organique"),
    ("c_n", "C/N"),
    ("c/n", "C/N"),
    ("saturation", "Saturation"),
    ("texture", "Texture"),
];

const WO: Table = &[
    ("report_title", "RAPOORU XAM-XAMU SÓL"),
    ("analysis_time", "Waxtu xam-xam"),
    ("parameters_title", "Ay paramètres yó nu joxé"),
    ("interpretation_title", "Xam-xamu agronomique"),
    ("recommendations_title", "Ay wàcc ak ay mburu yó mu baax"),
    ("parameter", "Paramètre"),
    ("value", "Njariñ"),
    ("unit", "Unité"),
    ("extraction_failed", "Joxe amul"),
    ("no_parameters", "Amul paramètres"),
    ("ph", "pH"),
    ("matiere_organique", "Matière organique"),
    ("azote_total", "Azote"),
    ("phosphore", "Phosphore"),
    ("potassium", "Potassium"),
    ("calcium", "Calcium"),
    ("magnesium", "Magnésium"),
    ("sodium", "Sodium"),
    ("cec", "CEC"),
    ("conductivite_electrique", "Conductivité"),
    ("carbone_organique", "Carbone"),
    ("c_n", "C/N"),
    ("saturation", "Saturation"),
    ("texture", "Texture"),
];

const BM: Table = &[
    ("report_title", "DUGUKOLO SEKO RAPORO"),
    ("analysis_time", "Seko waati"),
    ("parameters_title", "Paramètres minw bɔra"),
    ("interpretation_title", "Seko kɔrɔfoli"),
    ("recommendations_title", "Lakanaw ani jiri minw ka ɲi"),
    ("parameter", "Paramètre"),
    ("value", "Nafa"),
    ("unit", "Unité"),
    ("extraction_failed", "Bɔli ma se ka kɛ"),
    ("no_parameters", "Paramètres si tɛ"),
    ("ph", "pH"),
    ("matiere_organique", "Matière organique"),
    ("azote_total", "Azote"),
    ("phosphore", "Phosphore"),
    ("potassium", "Potassium"),
    ("calcium", "Calcium"),
    ("magnesium", "Magnésium"),
    ("sodium", "Sodium"),
    ("cec", "CEC"),
    ("conductivite_electrique", "Conductivité"),
    ("carbone_organique", "Carbone"),
    ("c_n", "C/N"),
    ("saturation", "Saturation"),
    ("texture", "Texture"),
];

fn table(lang: Language) -> Table {
    match lang {
        Language::Fr => FR,
        Language::Wo => WO,
        Language::Bm => BM,
    }
}

fn lookup(table: Table, key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// Localised string for `key`, falling back to French, then to `key`.
pub fn get_translation(key: &str, lang: Language) -> String {
    lookup(table(lang), key)
        .or_else(|| lookup(FR, key))
        .map_or_else(|| key.to_string(), str::to_string)
}

/// Localised label for a parameter base name.
///
/// The lookup key is the base lowercased, spaces joined with `_`,
/// apostrophes dropped and Latin accents stripped, so `"Matière organique"`
/// and `"matiere_organique"` share a label. Names without a translation get
/// a title-cased rendering of the base.
pub fn translate_parameter_name(base: &str, lang: Language) -> String {
    let key = label_key(base);
    lookup(table(lang), &key)
        .or_else(|| lookup(FR, &key))
        .map_or_else(|| title_case(base.trim()), str::to_string)
}

fn label_key(base: &str) -> String {
    base.trim()
        .to_lowercase()
        .replace(['\'', '’'], "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .map(strip_accent)
        .collect()
}

fn strip_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ä' | 'ã' => 'a',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ò' | 'ó' | 'ô' | 'ö' | 'õ' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}
