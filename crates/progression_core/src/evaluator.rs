//! crates/progression_core/src/evaluator.rs
//!
//! Scores one submitted answer against a question's stored correct answer.
//! Pure: no I/O, never mutates the question, never fails. Malformed or
//! missing submission fields simply evaluate to `false`.

use std::collections::HashSet;
use uuid::Uuid;

use crate::domain::{ChoiceOption, ImageZone, MatchingPair, Question, QuestionBody, SubmittedAnswer, TextRule};

/// Largest edit distance still accepted when spelling errors are tolerated.
pub const MAX_SPELLING_DISTANCE: usize = 2;

/// Returns whether `answer` is a correct response to `question`.
pub fn evaluate(question: &Question, answer: &SubmittedAnswer) -> bool {
    match &question.body {
        QuestionBody::ChoiceSingle { options } | QuestionBody::ChoiceMulti { options } => {
            evaluate_choice(options, answer)
        }
        QuestionBody::Matching { pairs } => evaluate_matching(pairs, answer),
        QuestionBody::ImageZone { zones } => evaluate_image_zone(zones, answer),
        QuestionBody::Text(rule) => evaluate_text(rule, answer),
    }
}

/// Set equality between the selected ids and the options flagged correct.
fn evaluate_choice(options: &[ChoiceOption], answer: &SubmittedAnswer) -> bool {
    let selected: HashSet<Uuid> = match (&answer.selected_option_ids, answer.selected_option_id) {
        (Some(ids), _) => ids.iter().copied().collect(),
        (None, Some(id)) => HashSet::from([id]),
        (None, None) => return false,
    };
    let correct: HashSet<Uuid> = options.iter().filter(|o| o.is_correct).map(|o| o.id).collect();

    !selected.is_empty() && selected == correct
}

/// The submitted mapping must reproduce every pair and nothing else.
fn evaluate_matching(pairs: &[MatchingPair], answer: &SubmittedAnswer) -> bool {
    let Some(submitted) = &answer.pairs else {
        return false;
    };
    if pairs.is_empty() || submitted.len() != pairs.len() {
        return false;
    }
    pairs
        .iter()
        .all(|pair| submitted.get(&pair.left_item) == Some(&pair.right_item))
}

/// Hit if the click lies within (boundary inclusive) the radius of any zone.
fn evaluate_image_zone(zones: &[ImageZone], answer: &SubmittedAnswer) -> bool {
    let Some(point) = answer.clicked_coordinates else {
        return false;
    };
    let (Some(x), Some(y)) = (point.x, point.y) else {
        return false;
    };
    zones.iter().any(|zone| {
        let dx = x - zone.center_x;
        let dy = y - zone.center_y;
        (dx * dx + dy * dy).sqrt() <= zone.radius
    })
}

fn evaluate_text(rule: &TextRule, answer: &SubmittedAnswer) -> bool {
    let Some(raw) = answer.text_answer.as_deref() else {
        return false;
    };
    let (submitted, expected) = if rule.case_sensitive {
        (raw.trim().to_string(), rule.accepted_answer.trim().to_string())
    } else {
        (raw.trim().to_lowercase(), rule.accepted_answer.trim().to_lowercase())
    };

    if rule.ignore_spelling_errors {
        levenshtein(&submitted, &expected) <= MAX_SPELLING_DISTANCE
    } else {
        submitted == expected
    }
}

/// Edit distance over Unicode scalar values, two-row dynamic programming.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ClickPoint;
    use std::collections::BTreeMap;

    fn question(body: QuestionBody) -> Question {
        Question {
            id: Uuid::new_v4(),
            quiz_id: Uuid::new_v4(),
            content_text: "q".into(),
            explanation: None,
            media_ref: None,
            body,
        }
    }

    fn option(is_correct: bool) -> ChoiceOption {
        ChoiceOption { id: Uuid::new_v4(), text: "o".into(), is_correct }
    }

    fn selected(ids: &[Uuid]) -> SubmittedAnswer {
        SubmittedAnswer { selected_option_ids: Some(ids.to_vec()), ..Default::default() }
    }

    #[test]
    fn multi_choice_requires_exact_set() {
        let opts = vec![option(true), option(true), option(false)];
        let (a, b, wrong) = (opts[0].id, opts[1].id, opts[2].id);
        let q = question(QuestionBody::ChoiceMulti { options: opts });

        assert!(evaluate(&q, &selected(&[b, a])));
        assert!(!evaluate(&q, &selected(&[a])), "subset");
        assert!(!evaluate(&q, &selected(&[a, b, wrong])), "superset");
        assert!(!evaluate(&q, &selected(&[wrong])), "disjoint");
        assert!(!evaluate(&q, &selected(&[])), "empty");
        assert!(!evaluate(&q, &SubmittedAnswer::default()), "missing");
    }

    #[test]
    fn true_false_accepts_single_id_field() {
        let opts = vec![option(true), option(false)];
        let (yes, no) = (opts[0].id, opts[1].id);
        let q = question(QuestionBody::ChoiceSingle { options: opts });

        let pick = |id| SubmittedAnswer { selected_option_id: Some(id), ..Default::default() };
        assert!(evaluate(&q, &pick(yes)));
        assert!(!evaluate(&q, &pick(no)));
        assert!(evaluate(&q, &selected(&[yes])));
    }

    #[test]
    fn matching_is_all_or_nothing() {
        let pairs = vec![
            MatchingPair { left_item: "Femur".into(), right_item: "Leg".into() },
            MatchingPair { left_item: "Ulna".into(), right_item: "Arm".into() },
        ];
        let q = question(QuestionBody::Matching { pairs });
        let submit = |entries: &[(&str, &str)]| SubmittedAnswer {
            pairs: Some(
                entries.iter().map(|(l, r)| (l.to_string(), r.to_string())).collect::<BTreeMap<_, _>>(),
            ),
            ..Default::default()
        };

        assert!(evaluate(&q, &submit(&[("Femur", "Leg"), ("Ulna", "Arm")])));
        assert!(!evaluate(&q, &submit(&[("Femur", "Leg")])), "missing pair");
        assert!(!evaluate(&q, &submit(&[("Femur", "Arm"), ("Ulna", "Leg")])), "swapped");
        assert!(
            !evaluate(&q, &submit(&[("Femur", "Leg"), ("Ulna", "Arm"), ("Tibia", "Leg")])),
            "extra item"
        );
        assert!(!evaluate(&q, &SubmittedAnswer::default()));
    }

    #[test]
    fn image_zone_boundary_is_inclusive() {
        let zones = vec![
            ImageZone { label: "heart".into(), center_x: 100.0, center_y: 50.0, radius: 10.0 },
            ImageZone { label: "lung".into(), center_x: 300.0, center_y: 80.0, radius: 20.0 },
        ];
        let q = question(QuestionBody::ImageZone { zones });
        let click = |x: f64, y: f64| SubmittedAnswer {
            clicked_coordinates: Some(ClickPoint { x: Some(x), y: Some(y) }),
            ..Default::default()
        };

        assert!(evaluate(&q, &click(100.0, 50.0)), "center");
        assert!(evaluate(&q, &click(110.0, 50.0)), "on the radius");
        assert!(!evaluate(&q, &click(111.0, 50.0)), "radius + 1");
        assert!(evaluate(&q, &click(315.0, 80.0)), "second zone counts too");
        assert!(!evaluate(&q, &SubmittedAnswer::default()), "no click");
        let half = SubmittedAnswer {
            clicked_coordinates: Some(ClickPoint { x: Some(100.0), y: None }),
            ..Default::default()
        };
        assert!(!evaluate(&q, &half));
    }

    fn text_question(case_sensitive: bool, ignore_spelling_errors: bool) -> Question {
        question(QuestionBody::Text(TextRule {
            accepted_answer: "Calcaneus".into(),
            case_sensitive,
            ignore_spelling_errors,
        }))
    }

    fn typed(text: &str) -> SubmittedAnswer {
        SubmittedAnswer { text_answer: Some(text.into()), ..Default::default() }
    }

    #[test]
    fn text_tolerates_two_edits() {
        let q = text_question(false, true);
        assert!(evaluate(&q, &typed("Calcaneum")));
        assert!(evaluate(&q, &typed("calcanues")));
        assert!(evaluate(&q, &typed("  CALCANEUS ")));
        assert!(!evaluate(&q, &typed("Calc")));
        assert!(!evaluate(&q, &typed("Calcxxxus")), "distance 3");
    }

    #[test]
    fn text_exact_match_respects_case_flag() {
        assert!(evaluate(&text_question(false, false), &typed("calcaneus")));
        assert!(!evaluate(&text_question(true, false), &typed("calcaneus")));
        assert!(evaluate(&text_question(true, false), &typed("Calcaneus")));
        assert!(!evaluate(&text_question(false, false), &typed("Calcaneum")));
        assert!(!evaluate(&text_question(false, true), &SubmittedAnswer::default()));
    }

    #[test]
    fn case_sensitive_spelling_counts_case_edits() {
        let q = text_question(true, true);
        assert!(evaluate(&q, &typed("calcaneus")), "one substitution");
        assert!(!evaluate(&q, &typed("cALCaneus")));
    }

    #[test]
    fn levenshtein_distances() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("calcaneus", "calcaneum"), 1);
        assert_eq!(levenshtein("calcaneus", "calcanues"), 2);
        assert_eq!(levenshtein("same", "same"), 0);
        assert_eq!(levenshtein("été", "ete"), 2);
    }

    #[test]
    fn evaluation_is_repeatable() {
        let q = text_question(false, true);
        let before = q.clone();
        for _ in 0..3 {
            assert!(evaluate(&q, &typed("calcaneus")));
        }
        assert_eq!(q, before);
    }
}
