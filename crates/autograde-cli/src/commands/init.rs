//! The `autograde init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("autograde.toml").exists() {
        println!("autograde.toml already exists, skipping.");
    } else {
        std::fs::write("autograde.toml", SAMPLE_CONFIG)?;
        println!("Created autograde.toml");
    }

    std::fs::create_dir_all("worksheets")?;
    let example_path = std::path::Path::new("worksheets/example.toml");
    if example_path.exists() {
        println!("worksheets/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_WORKSHEET)?;
        println!("Created worksheets/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Run: autograde validate --worksheet worksheets/example.toml");
    println!("  2. Write answers.json, e.g. {{\"q1\": 1, \"q3\": \"Jupiter\"}}");
    println!("  3. Run: autograde grade --worksheet worksheets/example.toml --answers answers.json");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# autograde configuration

# Minimum similarity (0..1) for partial short-answer credit
similarity_threshold = 0.8
# Pass score (percent) for worksheets that do not set passScore
default_pass_score = 70
# Max submissions graded concurrently by `autograde batch`
parallelism = 4
output_dir = "./autograde-results"
"#;

const EXAMPLE_WORKSHEET: &str = r#"id = "example"
title = "The Solar System"
description = "A short example worksheet covering every question type"
subject = "science"
gradeLevel = "4"
difficulty = "beginner"
estimatedTime = 10
passScore = 70

[[questions]]
id = "q1"
type = "multiple-choice"
prompt = "Which planet is closest to the Sun?"
points = 2
options = ["Venus", "Mercury", "Mars"]
correctAnswer = 1

[[questions]]
id = "q2"
type = "checkbox"
prompt = "Select the gas giants."
points = 3
options = ["Jupiter", "Earth", "Saturn", "Mars"]
correctAnswers = [0, 2]

[[questions]]
id = "q3"
type = "short-answer"
prompt = "Name the largest planet."
points = 5
correctAnswer = "Jupiter"

[[questions]]
id = "q4"
type = "matching"
prompt = "Match each planet with its nickname."
points = 4
pairs = [
    { left = "Mars", right = "Red Planet" },
    { left = "Earth", right = "Blue Planet" },
]

[[questions]]
id = "q5"
type = "ordering"
prompt = "Order these planets by distance from the Sun."
points = 3
items = ["Earth", "Mercury", "Venus"]
correctOrder = [1, 2, 0]
"#;
