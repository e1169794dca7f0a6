use std::collections::HashSet;
use std::sync::LazyLock;

/// Common English function words and auxiliary verbs that carry no topic
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "this", "that", "are", "from", "was", "were", "you", "your",
    "has", "have", "had", "will", "can", "could", "would", "should", "may", "might", "must",
    "shall", "do", "does", "did", "done", "is", "am", "be", "been", "being", "get", "got",
    "gotten", "go", "went", "gone", "come", "came", "see", "saw", "seen", "know", "knew",
    "known", "think", "thought", "take", "took", "taken", "make", "made", "give", "gave",
    "given", "find", "found", "look", "looked", "use", "used", "work", "worked", "call",
    "called", "try", "tried", "ask", "asked", "need", "needed", "feel", "felt", "become",
    "became", "leave", "left", "put", "keep", "kept", "let", "begin", "began", "begun", "seem",
    "seemed", "help", "helped", "show", "showed", "shown", "hear", "heard", "play", "played",
    "run", "ran", "move", "moved", "live", "lived", "believe", "believed", "bring", "brought",
    "happen", "happened", "write", "wrote", "written", "sit", "sat", "stand", "stood", "lose",
    "lost", "pay", "paid", "meet", "met", "include", "included", "continue", "continued",
    "set", "follow", "followed", "stop", "stopped", "create", "created", "speak", "spoke",
    "spoken", "read", "allow", "allowed", "add", "added", "spend", "spent", "grow", "grew",
    "grown", "open", "opened", "walk", "walked", "win", "won", "offer", "offered", "remember",
    "remembered", "love", "loved", "consider", "considered", "appear", "appeared", "buy",
    "bought", "wait", "waited", "serve", "served", "die", "died", "send", "sent", "expect",
    "expected", "build", "built", "stay", "stayed", "fall", "fell", "fallen", "cut", "reach",
    "reached", "kill", "killed", "remain", "remained", "suggest", "suggested", "raise",
    "raised", "pass", "passed", "sell", "sold", "require", "required", "report", "reported",
    "decide", "decided", "pull", "pulled",
];

static STOP_WORD_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOP_WORDS.iter().copied().collect());

/// Returns true if `word` (already lower-cased) is a stop word
pub fn is_stop_word(word: &str) -> bool {
    STOP_WORD_SET.contains(word)
}
