// Opening exchange every assistant conversation starts from.

pub const GREETING_USER: &str = "Hello";

pub const GREETING_MODEL: &str = "Great to meet you. What would you like to know?";
