//! Built-in quick workout templates and the default route.
//!
//! This is read-only reference data for the controllers: templates become
//! [`ExerciseStep`] lists for the guided player, and the park loop feeds the
//! simulated position stream.

use crate::player::{ExerciseStep, StepTarget};
use crate::{Coordinate, WorkoutType};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Cached default catalog
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

/// Skill level a template is aimed at
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

/// A pre-defined guided workout
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkoutTemplate {
    pub id: String,
    pub name: String,
    pub description: String,
    pub duration_minutes: u32,
    pub difficulty: Difficulty,
    pub workout_type: WorkoutType,
    pub exercises: Vec<ExerciseStep>,
}

impl WorkoutTemplate {
    /// Steps for the guided player, in template order
    pub fn steps(&self) -> Vec<ExerciseStep> {
        self.exercises.clone()
    }

    pub fn total_sets(&self) -> u32 {
        self.exercises.iter().map(|e| e.sets).sum()
    }
}

/// The template catalog
#[derive(Clone, Debug)]
pub struct Catalog {
    pub templates: HashMap<String, WorkoutTemplate>,
}

impl Catalog {
    pub fn get(&self, id: &str) -> Option<&WorkoutTemplate> {
        self.templates.get(id)
    }

    /// Templates sorted by id
    pub fn sorted(&self) -> Vec<&WorkoutTemplate> {
        let mut all: Vec<_> = self.templates.values().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub fn by_type(&self, workout_type: WorkoutType) -> Vec<&WorkoutTemplate> {
        self.sorted()
            .into_iter()
            .filter(|t| t.workout_type == workout_type)
            .collect()
    }

    /// Check every template can be played; returns one message per problem
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (key, template) in &self.templates {
            if key != &template.id {
                errors.push(format!("Template key {} does not match id {}", key, template.id));
            }
            if template.exercises.is_empty() {
                errors.push(format!("Template {} has no exercises", template.id));
            }
            if !template.workout_type.is_exercise_based() {
                errors.push(format!(
                    "Template {} uses GPS type {:?}",
                    template.id, template.workout_type
                ));
            }
            for step in &template.exercises {
                if step.sets == 0 {
                    errors.push(format!("{} / {}: zero sets", template.id, step.name));
                }
                if matches!(step.target, StepTarget::Reps(0) | StepTarget::DurationSeconds(0)) {
                    errors.push(format!("{} / {}: empty target", template.id, step.name));
                }
            }
        }

        errors
    }
}

fn reps(name: &str, sets: u32, reps: u32, rest: u32) -> ExerciseStep {
    ExerciseStep::reps(name, sets, reps, rest)
}

fn timed(name: &str, sets: u32, seconds: u32, rest: u32) -> ExerciseStep {
    ExerciseStep::timed(name, sets, seconds, rest)
}

/// Builds the default catalog
pub fn build_default_catalog() -> Catalog {
    let templates = vec![
        WorkoutTemplate {
            id: "morning_energizer".into(),
            name: "Morning Energizer".into(),
            description: "Quick full-body wake-up routine to start your day with energy.".into(),
            duration_minutes: 15,
            difficulty: Difficulty::Beginner,
            workout_type: WorkoutType::Strength,
            exercises: vec![
                timed("Jumping Jacks", 2, 45, 15),
                reps("Squats", 2, 12, 30),
                reps("Push-ups", 2, 10, 30),
                timed("Plank", 2, 20, 20),
                timed("High Knees", 2, 30, 15),
            ],
        },
        WorkoutTemplate {
            id: "hiit_blast".into(),
            name: "HIIT Blast".into(),
            description: "High-intensity interval training to maximize calorie burn.".into(),
            duration_minutes: 20,
            difficulty: Difficulty::Advanced,
            workout_type: WorkoutType::Hiit,
            exercises: vec![
                reps("Burpees", 4, 10, 20),
                reps("Squat Jumps", 4, 12, 20),
                timed("Mountain Climbers", 4, 30, 15),
                timed("High Knees", 4, 30, 15),
                reps("Skater Jumps", 3, 16, 20),
            ],
        },
        WorkoutTemplate {
            id: "strength_builder".into(),
            name: "Strength Builder".into(),
            description: "Focus on building muscle with controlled movements.".into(),
            duration_minutes: 30,
            difficulty: Difficulty::Intermediate,
            workout_type: WorkoutType::Strength,
            exercises: vec![
                reps("Squats", 4, 12, 45),
                reps("Push-ups", 4, 12, 45),
                reps("Lunges", 3, 10, 45),
                reps("Glute Bridges", 3, 15, 30),
                reps("Tricep Dips", 3, 12, 45),
                timed("Plank", 3, 45, 30),
            ],
        },
        WorkoutTemplate {
            id: "core_crusher".into(),
            name: "Core Crusher".into(),
            description: "Targeted core workout for a strong midsection.".into(),
            duration_minutes: 15,
            difficulty: Difficulty::Intermediate,
            workout_type: WorkoutType::Strength,
            exercises: vec![
                timed("Plank", 3, 45, 20),
                timed("Mountain Climbers", 3, 30, 20),
                reps("Glute Bridges", 3, 15, 20),
                timed("High Knees", 2, 30, 20),
            ],
        },
        WorkoutTemplate {
            id: "yoga_flow".into(),
            name: "Yoga Flow".into(),
            description: "Relaxing yoga sequence for flexibility and mindfulness.".into(),
            duration_minutes: 20,
            difficulty: Difficulty::Beginner,
            workout_type: WorkoutType::Yoga,
            exercises: vec![
                timed("Cat-Cow Stretch", 1, 60, 10),
                timed("Downward Dog", 2, 45, 10),
                timed("Warrior I", 2, 30, 10),
                timed("Pigeon Pose", 2, 45, 10),
                timed("Child's Pose", 1, 60, 0),
            ],
        },
    ];

    Catalog {
        templates: templates.into_iter().map(|t| (t.id.clone(), t)).collect(),
    }
}

/// Roughly 2 km loop through a park; first and last waypoints coincide
pub fn park_loop() -> Vec<Coordinate> {
    [
        (37.7749, -122.4194),
        (37.7752, -122.4185),
        (37.7758, -122.4178),
        (37.7765, -122.4172),
        (37.7772, -122.4168),
        (37.7780, -122.4165),
        (37.7788, -122.4163),
        (37.7795, -122.4165),
        (37.7800, -122.4170),
        (37.7803, -122.4178),
        (37.7805, -122.4188),
        (37.7803, -122.4198),
        (37.7798, -122.4208),
        (37.7790, -122.4215),
        (37.7782, -122.4218),
        (37.7773, -122.4218),
        (37.7765, -122.4215),
        (37.7758, -122.4210),
        (37.7752, -122.4203),
        (37.7749, -122.4194),
    ]
    .into_iter()
    .map(|(lat, lon)| Coordinate::new(lat, lon))
    .collect()
}
