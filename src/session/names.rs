use rand::Rng;

const FIRST: &[&str] = &[
    "Jimi", "Elvis", "Aretha", "Freddie", "Dolly", "Stevie", "Janis", "Johnny", "Etta", "Marvin",
    "Patsy", "Otis", "Nina", "Chuck", "Billie", "Ray", "Tina", "Buddy", "Ella", "Hank",
];

const LAST: &[&str] = &[
    "Hendrix", "Presley", "Franklin", "Mercury", "Parton", "Wonder", "Joplin", "Cash", "James",
    "Gaye", "Cline", "Redding", "Simone", "Berry", "Holiday", "Charles", "Turner", "Holly",
    "Fitzgerald", "Williams",
];

/// A whimsical two-word stage name for guests who join without one.
pub fn generate() -> String {
    let mut rng = rand::thread_rng();
    format!(
        "{} {}",
        FIRST[rng.gen_range(0..FIRST.len())],
        LAST[rng.gen_range(0..LAST.len())]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_name_has_two_words() {
        for _ in 0..32 {
            let name = generate();
            assert_eq!(name.split(' ').count(), 2);
        }
    }
}
