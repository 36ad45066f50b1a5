// src/messages.rs

pub fn grant_announcement(name: &str) -> String {
    format!("Giving starting items to {}", name)
}
