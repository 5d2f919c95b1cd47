use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    /// Breakfast, lunch and dinner every day, plus a snack on even days.
    pub fn for_day(day: u32) -> Vec<MealType> {
        let mut types = vec![MealType::Breakfast, MealType::Lunch, MealType::Dinner];
        if day % 2 == 0 {
            types.push(MealType::Snack);
        }
        types
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            MealType::Breakfast => "Breakfast",
            MealType::Lunch => "Lunch",
            MealType::Dinner => "Dinner",
            MealType::Snack => "Snack",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "breakfast" => Some(MealType::Breakfast),
            "lunch" => Some(MealType::Lunch),
            "dinner" => Some(MealType::Dinner),
            "snack" => Some(MealType::Snack),
            _ => None,
        }
    }
}

impl std::fmt::Display for MealType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MealSource {
    #[serde(rename = "AI Generated")]
    AiGenerated,
    #[serde(rename = "Placeholder")]
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionalInfo {
    pub calories: u32,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub meal_type: MealType,
    pub recipe_name: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub nutritional_info: NutritionalInfo,
    pub preparation_time: String,
    pub instructions: String,
    pub source: MealSource,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MealSchemaError {
    #[error("meal is not a JSON object")]
    NotAnObject,
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` should be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
    #[error("field `{0}` must not be negative")]
    Negative(&'static str),
    #[error("expected a {expected} but got `{found}`")]
    MealTypeMismatch { expected: MealType, found: String },
}

impl Meal {
    /// Validate an LLM meal object field by field against the schema for
    /// the `expected` slot. Integer macros become floats, float calories are
    /// rounded, list instructions are joined and unknown fields are dropped.
    pub fn from_llm_value(value: &Value, expected: MealType) -> Result<Meal, MealSchemaError> {
        let obj = value.as_object().ok_or(MealSchemaError::NotAnObject)?;

        let raw_type = required_str(obj, "meal_type")?;
        match MealType::parse(raw_type) {
            Some(found) if found == expected => {}
            _ => {
                return Err(MealSchemaError::MealTypeMismatch {
                    expected,
                    found: raw_type.to_string(),
                })
            }
        }

        let recipe_name = required_str(obj, "recipe_name")?.trim().to_string();
        if recipe_name.is_empty() {
            return Err(MealSchemaError::MissingField("recipe_name"));
        }
        let description = required_str(obj, "description")?.trim().to_string();

        let ingredients = match obj.get("ingredients") {
            None | Some(Value::Null) => return Err(MealSchemaError::MissingField("ingredients")),
            Some(Value::Array(items)) => items
                .iter()
                .map(|i| i.as_str().map(|s| s.trim().to_string()))
                .collect::<Option<Vec<_>>>()
                .ok_or(MealSchemaError::WrongType {
                    field: "ingredients",
                    expected: "a list of strings",
                })?,
            Some(_) => {
                return Err(MealSchemaError::WrongType {
                    field: "ingredients",
                    expected: "a list of strings",
                })
            }
        };
        if ingredients.is_empty() {
            return Err(MealSchemaError::MissingField("ingredients"));
        }

        let nutrition = match obj.get("nutritional_info") {
            None | Some(Value::Null) => {
                return Err(MealSchemaError::MissingField("nutritional_info"))
            }
            Some(Value::Object(n)) => n,
            Some(_) => {
                return Err(MealSchemaError::WrongType {
                    field: "nutritional_info",
                    expected: "an object",
                })
            }
        };
        let calories = number(nutrition, "calories")?.round() as u32;
        let nutritional_info = NutritionalInfo {
            calories,
            protein: number(nutrition, "protein")?,
            carbs: number(nutrition, "carbs")?,
            fat: number(nutrition, "fat")?,
        };

        let preparation_time = required_str(obj, "preparation_time")?.trim().to_string();

        let instructions = match obj.get("instructions") {
            None | Some(Value::Null) => return Err(MealSchemaError::MissingField("instructions")),
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Array(steps)) => steps
                .iter()
                .map(|s| s.as_str().map(str::trim))
                .collect::<Option<Vec<_>>>()
                .ok_or(MealSchemaError::WrongType {
                    field: "instructions",
                    expected: "a string",
                })?
                .join(" "),
            Some(_) => {
                return Err(MealSchemaError::WrongType {
                    field: "instructions",
                    expected: "a string",
                })
            }
        };

        Ok(Meal {
            meal_type: expected,
            recipe_name,
            description,
            ingredients,
            nutritional_info,
            preparation_time,
            instructions,
            source: MealSource::AiGenerated,
        })
    }

    /// Static last-resort meal for a slot every LLM tier failed on.
    pub fn placeholder(meal_type: MealType) -> Meal {
        Meal {
            meal_type,
            recipe_name: format!("Simple {} Bowl", meal_type.title()),
            description: "A simple placeholder recipe.".into(),
            ingredients: vec!["ingredient 1".into(), "ingredient 2".into()],
            nutritional_info: NutritionalInfo {
                calories: 300,
                protein: 12.0,
                carbs: 40.0,
                fat: 8.0,
            },
            preparation_time: "15 mins".into(),
            instructions: "Mix ingredients and serve.".into(),
            source: MealSource::Placeholder,
        }
    }
}

fn required_str<'a>(obj: &'a Map<String, Value>, field: &'static str) -> Result<&'a str, MealSchemaError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(MealSchemaError::MissingField(field)),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(MealSchemaError::WrongType {
            field,
            expected: "a string",
        }),
    }
}

fn number(obj: &Map<String, Value>, field: &'static str) -> Result<f64, MealSchemaError> {
    let value = match obj.get(field) {
        None | Some(Value::Null) => return Err(MealSchemaError::MissingField(field)),
        Some(v) => v.as_f64().ok_or(MealSchemaError::WrongType {
            field,
            expected: "a number",
        })?,
    };
    if value < 0.0 || !value.is_finite() {
        return Err(MealSchemaError::Negative(field));
    }
    Ok(value)
}
