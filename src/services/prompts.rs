// src/services/prompts.rs
//
// Fixed instruction templates for the model calls. Each template embeds the
// exact JSON shape the normalizer expects, so any drift between the two must
// be made in both places.

use crate::models::SkinAnalysis;

pub const SKIN_ANALYSIS_PROMPT: &str = r#"You are an AI assistant that visually analyzes skin photos.

Your task is to describe what you observe in the image in a calm, clear, and non-diagnostic manner.

GUIDELINES:
- Describe visible features based purely on appearance
- You may use descriptive terms such as:
  "localized raised lesion", "pigmented spot", "vascular lesion-like area", "inflamed breakout", "uneven texture", "area of redness", "visible pores", "dry patches", "surface roughness", "textural irregularity"
- Do NOT guess or diagnose medical conditions
- Prefer more specific descriptive labels over generic terms like "blemish" when the image supports it
- Keep language professional, factual, and non-alarming
- Base all observations ONLY on what you can visually see in THIS photo
- If you cannot clearly see something, acknowledge the limitation

VISUAL ANALYSIS APPROACH:
1. Examine overall skin appearance:
   - Texture (smooth, rough, uneven)
   - Tone (even, patchy, discolored areas)
   - Surface characteristics (shine, dryness, flakiness)
   - Pore visibility

2. Identify specific visible features:
   - Raised areas or bumps
   - Flat pigmented spots
   - Areas of redness or inflammation
   - Textural changes
   - Surface disruptions

3. Note locations precisely:
   - Use anatomical terms: "mid-forehead", "left cheek", "chin area", "T-zone", "around nose", "jawline"
   - Describe distribution: "scattered across", "concentrated in", "isolated to"

Return ONLY valid JSON in the following structure (no markdown, no code blocks, no extra text):

{
  "skin_type": "Normal|Dry|Oily|Combination|Sensitive|Unknown",
  "overall_assessment": "2-3 human-friendly sentences describing what you visually observe in this photo. Focus on appearance, not assumptions.",
  "key_concerns": [
    {
      "name": "Descriptive visual label (e.g., 'Localized raised lesion', 'Cluster of inflamed breakouts', 'Pigmented spots', 'Textural roughness')",
      "severity": "Mild|Moderate|Severe",
      "location": "Specific anatomical location where you see this feature",
      "short_description": "1-2 sentences describing exactly what you observe visually - size, color, distribution, appearance"
    }
  ],
  "ingredients_to_avoid": [
    {
      "name": "Ingredient name",
      "reason": "Short explanation of why it may irritate or worsen this visible skin condition"
    }
  ],
  "ingredients_that_help": [
    {
      "name": "Ingredient name (with percentage if standard, e.g., 'Niacinamide 10%', 'Salicylic Acid 2%')",
      "use_for": "How it may support or calm the visible concern you observed",
      "product_type": "Serum|Cleanser|Moisturiser|SPF|Spot Treatment"
    }
  ],
  "general_recommendations": [
    "Short and practical tip based on what you observe",
    "Short and practical tip based on what you observe",
    "Short and practical tip based on what you observe"
  ],
  "dermatology_advice": "Short paragraph (2-3 sentences) on when professional review would be sensible based on what you observe.",
  "action_plan_steps": [
    {
      "title": "Step name (e.g., 'Seek Professional Consultation', 'Gentle Skincare Routine', 'Targeted Treatment', 'Sun Protection', 'Hands Off')",
      "priority": "High|Medium|Low",
      "description": "1-2 sentence step explaining what to do and why, based on what you observed"
    }
  ],
  "quick_tips": [
    "Short, practical tip (e.g., 'Avoid picking or squeezing the area.')",
    "Short, practical tip",
    "Short, practical tip"
  ]
}

CRITICAL RULES:
- If skin type cannot be clearly inferred from the image, return "Unknown"
- Be visually descriptive but not alarming
- Keep all text concise and factual
- Focus on appearance, not medical diagnosis
- Provide 3-5 key concerns if multiple features are visible
- Suggest 2-4 ingredients to avoid and 4-6 ingredients that may help
- All recommendations must relate to what you actually observe in the photo
- Provide 4-6 action plan steps with specific, practical actions
- Action plan steps should be prioritized: High priority for urgent/important actions, Medium for beneficial routines, Low for optional enhancements
- Quick tips should be 3-5 short, immediately actionable bullets"#;

pub const PRODUCT_ANALYSIS_PROMPT: &str = r#"Analyze these skincare products. Return ONLY valid JSON with NO extra text:

{
  "products": [
    {
      "name": "Product name",
      "brand": "Brand",
      "category": "cleanser|toner|serum|moisturizer|treatment",
      "keyIngredients": ["ingredient1", "ingredient2"]
    }
  ],
  "suggestions": [
    {
      "type": "redundancy|gap",
      "title": "Brief title",
      "description": "One sentence explanation"
    }
  ],
  "conflicts": [
    {
      "severity": "high|medium|low",
      "products": ["Product A", "Product B"],
      "issue": "Brief conflict description",
      "solution": "Brief solution"
    }
  ],
  "routine": {
    "AM": [
      {
        "step": 1,
        "category": "CLEANSER",
        "product": "Product name",
        "instructions": "Brief how-to"
      }
    ],
    "PM": [
      {
        "step": 1,
        "category": "CLEANSER",
        "product": "Product name",
        "instructions": "Brief how-to"
      }
    ]
  },
  "missing": [
    {
      "category": "What's missing",
      "importance": "critical|recommended",
      "reason": "Brief reason"
    }
  ]
}

Identify all visible products. Keep descriptions brief - one sentence each. Return complete valid JSON only."#;

pub fn skin_analysis_prompt() -> &'static str {
    SKIN_ANALYSIS_PROMPT
}

pub fn product_analysis_prompt() -> &'static str {
    PRODUCT_ANALYSIS_PROMPT
}

/// The only template that interpolates data: the plan references the skin
/// type and concern summary from an already-completed analysis.
pub fn action_plan_prompt(analysis: &SkinAnalysis) -> String {
    let concern_summary = if analysis.key_concerns.is_empty() {
        "No specific concerns were identified".to_string()
    } else {
        analysis
            .key_concerns
            .iter()
            .map(|c| format!("{} ({}) in {}", c.name, c.severity, c.location))
            .collect::<Vec<_>>()
            .join("; ")
    };

    format!(
        r#"You are a board-certified dermatologist creating a detailed, personalized Action Plan based on skin analysis results.

ANALYSIS SUMMARY:
- Skin Type: {skin_type}
- Concerns Identified: {concerns}

YOUR TASK:
Create a comprehensive, dermatologist-style action plan that feels like a professional consultation, NOT generic advice. The plan must reference specific areas visible in the photo and provide tailored guidance.

REQUIREMENTS:
1. Write in a warm, professional tone - like a dermatologist speaking directly to this patient
2. Reference SPECIFIC facial areas from the analysis (cheeks, T-zone, jawline, etc.)
3. Explain WHY each recommendation is important for THEIR specific concerns
4. Create detailed AM and PM routines with clear step-by-step instructions, specific product types and ingredients, application frequency, and important cautions
5. Include "When to See a Dermatologist" guidance
6. NO disclaimer at the top - it goes at the end

Return ONLY valid JSON (no markdown):

{{
  "introduction": "Personalized opening that acknowledges what you saw in their photo and their main concerns (2-3 sentences)",
  "skinTypeAnalysis": {{
    "type": "{skin_type}",
    "explanation": "Detailed explanation of their skin type based on visible characteristics in specific areas"
  }},
  "concernsDetailed": [
    {{
      "concern": "Concern name",
      "severity": "mild|moderate|severe",
      "location": "Specific areas",
      "analysis": "What you see and why it's happening, referencing the visible areas",
      "impact": "How this affects their skin health"
    }}
  ],
  "amRoutine": [
    {{
      "step": 1,
      "title": "Step name",
      "category": "Cleanse|Treat|Hydrate|Protect",
      "instruction": "Detailed how-to with specifics",
      "products": "What to use and why for THEIR concerns",
      "frequency": "How often",
      "tips": "Important tips or cautions"
    }}
  ],
  "pmRoutine": [
    {{
      "step": 1,
      "title": "Step name",
      "category": "Cleanse|Treat|Hydrate|Repair",
      "instruction": "Detailed how-to",
      "products": "What to use and why",
      "frequency": "How often",
      "tips": "Tips or cautions"
    }}
  ],
  "keyIngredients": [
    {{
      "name": "Ingredient with percentage",
      "purpose": "What it does for THEIR specific concerns",
      "usage": "When and how to use",
      "caution": "Important warnings"
    }}
  ],
  "lifestyleRecommendations": [
    "Specific lifestyle advice based on their concerns (diet, sleep, stress, sun protection, etc.)"
  ],
  "progressTracking": {{
    "week2": "What to expect in 2 weeks",
    "week6": "What to expect in 6 weeks",
    "week12": "What to expect in 12 weeks"
  }},
  "whenToSeeDermatologist": [
    "Specific signs that indicate professional consultation needed, based on their current concerns"
  ],
  "disclaimer": "Professional disclaimer - keep brief and place at end"
}}

Make it feel personal and specific to THIS person's skin, not a template. Reference the areas you analyzed."#,
        skin_type = analysis.skin_type,
        concerns = concern_summary,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Concern, Severity, SkinType};

    fn analysis_with_concern() -> SkinAnalysis {
        SkinAnalysis {
            skin_type: SkinType::Combination,
            overall_assessment: String::new(),
            key_concerns: vec![Concern {
                name: "Inflamed breakouts".to_string(),
                severity: Severity::Moderate,
                location: "chin area".to_string(),
                short_description: String::new(),
            }],
            ingredients_to_avoid: vec![],
            ingredients_that_help: vec![],
            general_recommendations: vec![],
            dermatology_advice: String::new(),
            action_plan_steps: vec![],
            quick_tips: vec![],
            health_score: 0,
        }
    }

    #[test]
    fn skin_prompt_embeds_target_schema() {
        let prompt = skin_analysis_prompt();
        assert!(prompt.contains("\"skin_type\""));
        assert!(prompt.contains("Mild|Moderate|Severe"));
        assert!(prompt.contains("Do NOT guess or diagnose"));
        assert!(prompt.contains("anatomical"));
    }

    #[test]
    fn product_prompt_embeds_routine_schema() {
        let prompt = product_analysis_prompt();
        assert!(prompt.contains("\"AM\""));
        assert!(prompt.contains("\"PM\""));
        assert!(prompt.contains("keyIngredients"));
    }

    #[test]
    fn action_plan_prompt_interpolates_analysis() {
        let prompt = action_plan_prompt(&analysis_with_concern());
        assert!(prompt.contains("Skin Type: Combination"));
        assert!(prompt.contains("Inflamed breakouts (Moderate) in chin area"));
        assert!(prompt.contains("whenToSeeDermatologist"));
    }

    #[test]
    fn action_plan_prompt_handles_empty_concerns() {
        let mut analysis = analysis_with_concern();
        analysis.key_concerns.clear();
        let prompt = action_plan_prompt(&analysis);
        assert!(prompt.contains("No specific concerns were identified"));
    }
}
