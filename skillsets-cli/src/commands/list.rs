use colored::Colorize;
use skillsets_core::Skill;

pub fn run() {
    println!("{}", "Available skills".bold().cyan());
    println!();
    for skill in Skill::ALL {
        let network = if skill.needs_network() {
            " (network)".dimmed().to_string()
        } else {
            String::new()
        };
        println!(
            "  {} {} {}{network}",
            format!("{:<12}", skill.name()).green(),
            format!("{:<30}", skill.report_file()).yellow(),
            skill.description()
        );
    }
}
