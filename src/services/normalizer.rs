// src/services/normalizer.rs
//
// Boundary between the free-text model reply and the typed result. The model
// is not contractually guaranteed to return well-formed JSON, so the reply is
// cleaned, sliced to its outermost object, repaired when truncated by a
// single trailing brace, and filled with structural defaults where the skin
// schema allows them. Concern data itself is never fabricated.

use crate::errors::SkinsightError;
use crate::models::{
    ActionPlan, ActionPlanStep, Concern, Priority, ProductAnalysis, Severity, SkinAnalysis,
};

const DEFAULT_ASSESSMENT: &str = "Based on the visual analysis of your skin, we've identified several areas that may benefit from targeted skincare. Please review the detailed findings below for personalized recommendations.";

const DEFAULT_TIPS: [&str; 3] = [
    "Stay hydrated by drinking plenty of water throughout the day.",
    "Get adequate sleep (7-9 hours) to support skin repair.",
    "Avoid touching your face with unwashed hands.",
];

fn default_action_plan_steps() -> Vec<ActionPlanStep> {
    vec![
        ActionPlanStep {
            title: "Gentle Skincare Routine".to_string(),
            priority: Priority::High,
            description: "Use gentle, fragrance-free products suitable for your skin type. Cleanse twice daily and moisturize regularly.".to_string(),
        },
        ActionPlanStep {
            title: "Sun Protection".to_string(),
            priority: Priority::High,
            description: "Apply broad-spectrum SPF 30+ daily, even on cloudy days. Reapply every 2 hours when outdoors.".to_string(),
        },
    ]
}

/// Recovers the JSON object embedded in a raw model reply.
///
/// Markdown fences and control characters are stripped, the text is sliced
/// from the first `{` to the last `}`, and a reply truncated after its final
/// brace gets exactly one `}` appended. Anything worse is a
/// `MalformedResponse`.
pub fn extract_json(raw: &str) -> Result<String, SkinsightError> {
    let mut cleaned = raw.replace("```json", "").replace("```", "");
    cleaned.retain(|c| {
        let code = c as u32;
        code > 0x1F && !(0x7F..=0x9F).contains(&code)
    });

    let start = cleaned.find('{').ok_or_else(|| {
        SkinsightError::MalformedResponse("no JSON object found in model reply".to_string())
    })?;

    let mut sliced = match cleaned.rfind('}') {
        Some(end) if end > start => cleaned[start..=end].to_string(),
        // Truncated tail: keep everything and attempt the one-character repair.
        _ => cleaned[start..].trim_end().to_string(),
    };

    if !sliced.ends_with('}') {
        sliced.push('}');
    }

    Ok(sliced)
}

pub fn normalize_skin(raw: &str) -> Result<SkinAnalysis, SkinsightError> {
    let json = extract_json(raw)?;
    let mut analysis: SkinAnalysis = serde_json::from_str(&json).map_err(|e| {
        SkinsightError::MalformedResponse(format!("skin analysis did not parse: {}", e))
    })?;

    // Only structural defaults are substituted; `skin_type` already falls
    // back to Unknown during deserialization.
    if analysis.overall_assessment.trim().is_empty() {
        analysis.overall_assessment = DEFAULT_ASSESSMENT.to_string();
    }
    if analysis.action_plan_steps.is_empty() {
        analysis.action_plan_steps = default_action_plan_steps();
    }
    if analysis.quick_tips.is_empty() {
        analysis.quick_tips = DEFAULT_TIPS.iter().map(|t| t.to_string()).collect();
    }

    analysis.health_score = health_score(&analysis.key_concerns);

    Ok(analysis)
}

pub fn normalize_product(raw: &str) -> Result<ProductAnalysis, SkinsightError> {
    let json = extract_json(raw)?;
    let analysis: ProductAnalysis = serde_json::from_str(&json).map_err(|e| {
        SkinsightError::MalformedResponse(format!("product analysis did not parse: {}", e))
    })?;

    if analysis.products.is_empty() {
        return Err(SkinsightError::InvalidResult(
            "No products could be identified. Please ensure product labels are clearly visible."
                .to_string(),
        ));
    }
    if analysis.routine.am.is_empty() || analysis.routine.pm.is_empty() {
        return Err(SkinsightError::InvalidResult(
            "The analysis came back without a complete AM/PM routine. Please try again."
                .to_string(),
        ));
    }

    Ok(analysis)
}

pub fn normalize_action_plan(raw: &str) -> Result<ActionPlan, SkinsightError> {
    let json = extract_json(raw)?;
    serde_json::from_str(&json).map_err(|e| {
        SkinsightError::MalformedResponse(format!("action plan did not parse: {}", e))
    })
}

/// Health score in [50, 100]: 100 minus 5/10/20 per Mild/Moderate/Severe
/// concern, floored at 50. Unrecognized severity tags carry no penalty.
pub fn health_score(concerns: &[Concern]) -> u8 {
    let penalty: i32 = concerns
        .iter()
        .map(|c| match c.severity {
            Severity::Mild => 5,
            Severity::Moderate => 10,
            Severity::Severe => 20,
            Severity::Unknown => 0,
        })
        .sum();

    (100 - penalty).clamp(50, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SkinType;

    fn concern(severity: Severity) -> Concern {
        Concern {
            name: "Test concern".to_string(),
            severity,
            location: "forehead".to_string(),
            short_description: String::new(),
        }
    }

    #[test]
    fn score_is_100_with_no_concerns() {
        assert_eq!(health_score(&[]), 100);
    }

    #[test]
    fn score_deducts_five_per_mild_concern() {
        for count in 1..=12 {
            let concerns: Vec<_> = (0..count).map(|_| concern(Severity::Mild)).collect();
            let expected = std::cmp::max(50, 100 - 5 * count as i32) as u8;
            assert_eq!(health_score(&concerns), expected);
        }
    }

    #[test]
    fn score_mixes_severities_and_clamps_at_50() {
        let concerns = vec![
            concern(Severity::Mild),
            concern(Severity::Moderate),
            concern(Severity::Severe),
        ];
        assert_eq!(health_score(&concerns), 65);

        let heavy: Vec<_> = (0..5).map(|_| concern(Severity::Severe)).collect();
        assert_eq!(health_score(&heavy), 50);
    }

    #[test]
    fn score_ignores_unrecognized_severity() {
        let concerns = vec![concern(Severity::Unknown), concern(Severity::Mild)];
        assert_eq!(health_score(&concerns), 95);
    }

    #[test]
    fn extract_json_recovers_object_from_fences_and_commentary() {
        let raw = "Sure! Here is the analysis you asked for:\n```json\n{\"skin_type\": \"Oily\"}\n```\nLet me know if you need anything else.";
        assert_eq!(extract_json(raw).unwrap(), "{\"skin_type\": \"Oily\"}");
    }

    #[test]
    fn extract_json_repairs_single_missing_trailing_brace() {
        let raw = "```json\n{\"skin_type\": \"Dry\", \"quick_tips\": [\"a\"]";
        let json = extract_json(raw).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["skin_type"], "Dry");
    }

    #[test]
    fn extract_json_fails_without_object() {
        let err = extract_json("I could not analyze this image.").unwrap_err();
        assert!(matches!(err, SkinsightError::MalformedResponse(_)));
    }

    #[test]
    fn deeper_truncation_is_not_repaired() {
        // last '}' closes an inner object; the repair only covers a missing
        // trailing brace
        let err = normalize_skin("{\"routine\": {\"AM\": 1}").unwrap_err();
        assert!(matches!(err, SkinsightError::MalformedResponse(_)));
    }

    #[test]
    fn normalize_skin_fills_structural_defaults() {
        let analysis = normalize_skin("{\"skin_type\": \"Oily\", \"overall_assessment\": \"\"}")
            .unwrap();
        assert_eq!(analysis.skin_type, SkinType::Oily);
        assert_eq!(analysis.overall_assessment, DEFAULT_ASSESSMENT);
        assert_eq!(analysis.action_plan_steps.len(), 2);
        assert_eq!(analysis.action_plan_steps[0].title, "Gentle Skincare Routine");
        assert_eq!(analysis.quick_tips.len(), 3);
        assert_eq!(analysis.health_score, 100);
    }

    #[test]
    fn normalize_skin_preserves_model_content() {
        let raw = r#"{
            "skin_type": "Combination",
            "overall_assessment": "Your skin shows an even tone with mild shine in the T-zone.",
            "key_concerns": [
                {"name": "Visible pores", "severity": "Mild", "location": "around nose", "short_description": "Slightly enlarged pores."},
                {"name": "Inflamed breakout", "severity": "Moderate", "location": "chin area", "short_description": "A small cluster of raised red spots."}
            ],
            "quick_tips": ["Pat skin dry instead of rubbing."]
        }"#;
        let analysis = normalize_skin(raw).unwrap();
        assert_eq!(
            analysis.overall_assessment,
            "Your skin shows an even tone with mild shine in the T-zone."
        );
        assert_eq!(analysis.key_concerns.len(), 2);
        assert_eq!(analysis.quick_tips, vec!["Pat skin dry instead of rubbing."]);
        assert_eq!(analysis.health_score, 85);
    }

    #[test]
    fn normalize_skin_round_trips_wrapped_object() {
        let object = r#"{"skin_type": "Normal", "overall_assessment": "Clear and even.", "key_concerns": []}"#;
        let wrapped = format!("Here you go:\n```json\n{}\n``` Hope that helps!", object);
        let analysis = normalize_skin(&wrapped).unwrap();
        assert_eq!(analysis.skin_type, SkinType::Normal);
        assert_eq!(analysis.overall_assessment, "Clear and even.");
        assert_eq!(analysis.health_score, 100);
    }

    #[test]
    fn normalize_product_accepts_complete_result() {
        let raw = r#"{
            "products": [{"name": "Foam Cleanser", "brand": "Acme", "category": "cleanser", "keyIngredients": ["glycerin"]}],
            "conflicts": [],
            "routine": {
                "AM": [{"step": 1, "category": "CLEANSER", "product": "Foam Cleanser", "instructions": "Massage and rinse."}],
                "PM": [{"step": 1, "category": "CLEANSER", "product": "Foam Cleanser", "instructions": "Massage and rinse."}]
            }
        }"#;
        let analysis = normalize_product(raw).unwrap();
        assert_eq!(analysis.products.len(), 1);
        assert_eq!(analysis.routine.am.len(), 1);
    }

    #[test]
    fn normalize_product_rejects_missing_pm_routine() {
        let raw = r#"{
            "products": [{"name": "Foam Cleanser"}],
            "routine": {"AM": [{"step": 1, "category": "CLEANSER", "product": "Foam Cleanser", "instructions": "Rinse."}]}
        }"#;
        let err = normalize_product(raw).unwrap_err();
        assert!(matches!(err, SkinsightError::InvalidResult(_)));
    }

    #[test]
    fn normalize_product_rejects_empty_product_list() {
        let raw = r#"{"products": [], "routine": {"AM": [{"step": 1}], "PM": [{"step": 1}]}}"#;
        let err = normalize_product(raw).unwrap_err();
        assert!(matches!(err, SkinsightError::InvalidResult(_)));
    }

    #[test]
    fn normalize_action_plan_parses_camel_case_wire_form() {
        let raw = r#"```json
        {
            "introduction": "Thanks for sharing your photo.",
            "skinTypeAnalysis": {"type": "Oily", "explanation": "Shine across the T-zone."},
            "amRoutine": [{"step": 1, "title": "Cleanse", "category": "Cleanse", "instruction": "Use a gel cleanser."}],
            "pmRoutine": [{"step": 1, "title": "Cleanse", "category": "Cleanse", "instruction": "Double cleanse."}],
            "progressTracking": {"week2": "Less shine.", "week6": "Fewer breakouts.", "week12": "Even tone."},
            "whenToSeeDermatologist": ["If irritation persists."],
            "disclaimer": "Not medical advice."
        }
        ```"#;
        let plan = normalize_action_plan(raw).unwrap();
        assert_eq!(plan.introduction, "Thanks for sharing your photo.");
        assert_eq!(plan.skin_type_analysis.unwrap().skin_type, SkinType::Oily);
        assert_eq!(plan.am_routine.len(), 1);
        assert_eq!(plan.progress_tracking.week6, "Fewer breakouts.");
    }
}
