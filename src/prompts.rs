//! Prompt text for every LLM task.

use crate::generator::MealType;

pub const QUERY_VALIDATION_SYSTEM: &str =
    "You are a precise query validation assistant. Always return valid JSON matching the exact schema.";

pub const DAY_PLAN_SYSTEM: &str =
    "You generate diverse, restriction-compliant recipes. Respond ONLY with valid JSON.";

pub const SINGLE_MEAL_SYSTEM: &str =
    "You are a professional chef. Generate a single, restriction-compliant recipe in JSON format.";

pub struct ValidationPromptInput<'a> {
    pub query: &'a str,
    pub draft_json: &'a str,
    pub restrictions: &'a [&'a str],
    pub preferences: &'a [&'a str],
    pub requirements: &'a [&'a str],
}

pub fn query_validation(input: &ValidationPromptInput<'_>) -> String {
    format!(
        r#"You are a deterministic query validation assistant for a meal planner API.
Validate and enhance query parameters extracted by pattern matching. The extraction may miss items, but preserve everything it extracted.

USER QUERY
{query}

INITIAL EXTRACTION (may be incomplete)
{draft}

CANONICAL VOCABULARY (use these exact spellings)
Dietary restrictions: {restrictions}
Preferences: {preferences}
Special requirements: {requirements}

FIELD DEFINITIONS
1. dietary_restrictions: exclusions or strict diet types (what the user cannot eat).
2. preferences: nutritional goals or macro preferences (what the user prefers).
3. special_requirements: practical constraints on preparation (budget-friendly, quick = 15 minutes or less, easy, healthy).

WARNING CATEGORIES (use exact names)
days_unspecified | days_capped_at_7 | dietary_restrictions_unspecified | preferences_unspecified | special_requirements_unspecified | conflicting_restrictions | synonym_inference

RULES
1. PRESERVE: keep every extracted item. Never remove anything.
2. ADD ONLY WHEN PRESENT: add a missing item only if the user query states it explicitly or unambiguously. Never invent items absent from the query.
3. SYNONYMS: map clear synonyms to the canonical vocabulary (e.g. "plant-based" -> vegan, "seafood only" -> pescatarian) and add a synonym_inference warning.
4. DURATION: must be 1-7 days. Only correct it if it is invalid or was not stated.
5. CONFLICTS: if restrictions conflict (e.g. vegan + pescatarian) add a conflicting_restrictions warning. Do not remove either.

OUTPUT
Return ONLY this JSON structure:
{{
  "validated": {{
    "duration_days": 1-7,
    "dietary_restrictions": [strings],
    "preferences": [strings],
    "special_requirements": [strings]
  }},
  "additional_warnings": [{{"category": "...", "value": "..."}}]
}}"#,
        query = input.query,
        draft = input.draft_json,
        restrictions = input.restrictions.join(", "),
        preferences = input.preferences.join(", "),
        requirements = input.requirements.join(", "),
    )
}

pub fn query_validation_schema() -> serde_json::Value {
    let strings = serde_json::json!({ "type": "array", "items": { "type": "string" } });
    serde_json::json!({
        "type": "object",
        "properties": {
            "validated": {
                "type": "object",
                "properties": {
                    "duration_days": { "type": "integer", "minimum": 1, "maximum": 7 },
                    "dietary_restrictions": strings,
                    "preferences": strings,
                    "special_requirements": strings
                },
                "required": ["duration_days", "dietary_restrictions", "preferences", "special_requirements"]
            },
            "additional_warnings": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "category": { "type": "string" },
                        "value": { "type": "string" }
                    },
                    "required": ["category", "value"]
                }
            }
        },
        "required": ["validated", "additional_warnings"]
    })
}

/// Constraint block shared by the day and single-meal prompts.
pub struct Constraints<'a> {
    pub restrictions: String,
    pub preferences: String,
    pub requirements: String,
    pub conflict_note: Option<&'a str>,
}

impl Constraints<'_> {
    fn render(&self) -> String {
        let mut out = format!(
            "DIETARY RESTRICTIONS (MUST COMPLY):\n{}\n\nPREFERENCES:\n{}\n\nSPECIAL REQUIREMENTS:\n{}",
            self.restrictions, self.preferences, self.requirements
        );
        if let Some(note) = self.conflict_note {
            out.push_str("\n\nNOTE: ");
            out.push_str(note);
        }
        out
    }
}

pub struct DayPromptInput<'a> {
    pub day: u32,
    pub date: &'a str,
    pub meal_types: &'a [MealType],
    pub constraints: &'a Constraints<'a>,
    pub previous_meals: &'a str,
    pub previous_nutrition: &'a str,
}

pub fn day_plan(input: &DayPromptInput<'_>) -> String {
    let meal_types = input
        .meal_types
        .iter()
        .map(MealType::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"You are an expert culinary AI generating a complete meal plan for DAY {day} ({date}).

MEAL TYPES REQUIRED (in this exact order): {meal_types}

{constraints}

PREVIOUS DAYS' MEALS (AVOID SIMILARITY):
{previous_meals}

Avoid the same ingredients, the same cuisine style twice in a row, the same protein source and similar recipe structures.

PREVIOUS DAYS' NUTRITIONAL TOTALS (FOR BALANCE):
{previous_nutrition}

NUTRITIONAL GUIDELINES
- Daily target about 2000-2500 calories, adjusted for the preferences.
- Protein 15-30%, carbs 45-65%, fat 20-35% of daily calories.
- Balance today against the previous days' totals.
- Distribute calories: breakfast ~25%, lunch ~35%, dinner ~35%, snack ~5%.

For each meal: keep it fresh and different from previous meals, comply with ALL restrictions and preferences, give ingredient quantities, write instructions as ONE string of complete sentences, use numbers for nutritional_info.

Return ONLY valid JSON, no markdown, no commentary:
{{
  "meals": [
    {{
      "meal_type": "breakfast|lunch|dinner|snack",
      "recipe_name": "...",
      "description": "...",
      "ingredients": ["1 cup ...", "..."],
      "nutritional_info": {{ "calories": 350, "protein": 20, "carbs": 40, "fat": 10 }},
      "preparation_time": "15 mins",
      "instructions": "Full sentence instructions.",
      "source": "AI Generated"
    }}
  ]
}}"#,
        day = input.day,
        date = input.date,
        meal_types = meal_types,
        constraints = input.constraints.render(),
        previous_meals = input.previous_meals,
        previous_nutrition = input.previous_nutrition,
    )
}

pub fn single_meal(meal_type: MealType, constraints: &Constraints<'_>, previous_meals: &str) -> String {
    format!(
        r#"Generate a single {meal_type} recipe that fully complies with all dietary restrictions and preferences.

{constraints}

PREVIOUS MEALS (AVOID SIMILARITY):
{previous_meals}

Include ingredient quantities. Instructions must be a single string. Nutritional info: calories as an integer, protein/carbs/fat as numbers in grams.

Return ONLY valid JSON, no markdown, no explanations:
{{
  "meal_type": "{meal_type}",
  "recipe_name": "...",
  "description": "...",
  "ingredients": ["1 cup ...", "..."],
  "nutritional_info": {{ "calories": 350, "protein": 20.0, "carbs": 40.0, "fat": 10.0 }},
  "preparation_time": "15 mins",
  "instructions": "Complete sentence instructions.",
  "source": "AI Generated"
}}"#,
        meal_type = meal_type,
        constraints = constraints.render(),
        previous_meals = previous_meals,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraints(note: Option<&str>) -> Constraints<'_> {
        Constraints {
            restrictions: "vegan".into(),
            preferences: "none".into(),
            requirements: "quick".into(),
            conflict_note: note,
        }
    }

    #[test]
    fn day_prompt_lists_slots_and_history() {
        let c = constraints(None);
        let prompt = day_plan(&DayPromptInput {
            day: 2,
            date: "2026-10-19",
            meal_types: &MealType::for_day(2),
            constraints: &c,
            previous_meals: "- Day 1 breakfast: Tofu Scramble",
            previous_nutrition: "None (Day 1)",
        });
        assert!(prompt.contains("DAY 2 (2026-10-19)"));
        assert!(prompt.contains("breakfast, lunch, dinner, snack"));
        assert!(prompt.contains("Tofu Scramble"));
        assert!(prompt.contains("vegan"));
        assert!(!prompt.contains("NOTE:"));
    }

    #[test]
    fn conflict_note_is_passed_through() {
        let c = constraints(Some("vegan and pescatarian were requested together"));
        let prompt = single_meal(MealType::Dinner, &c, "None");
        assert!(prompt.contains("NOTE: vegan and pescatarian"));
        assert!(prompt.contains("\"meal_type\": \"dinner\""));
    }

    #[test]
    fn validation_prompt_embeds_query_and_vocabulary() {
        let prompt = query_validation(&ValidationPromptInput {
            query: "plant-based week",
            draft_json: "{}",
            restrictions: &["vegan", "keto"],
            preferences: &["low-carb"],
            requirements: &["quick"],
        });
        assert!(prompt.contains("plant-based week"));
        assert!(prompt.contains("vegan, keto"));
        assert_eq!(query_validation_schema()["required"][0], "validated");
    }
}
