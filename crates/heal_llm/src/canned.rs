//! Offline generator with built-in programs.
//!
//! Picks a known-good program by keywords in the request. Useful for demos
//! and for exercising the sandbox without network access.

use async_trait::async_trait;
use heal_core::{GenerationError, GenerationRequest, Generator};
use heal_runner::Language;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Program {
    Quicksort,
    Fibonacci,
    BinarySearchTree,
    HelloWorld,
}

impl Program {
    fn detect(request: &str) -> Option<Self> {
        let request = request.to_lowercase();
        if request.contains("quicksort") || request.contains("quick sort") {
            Some(Self::Quicksort)
        } else if request.contains("fibonacci") {
            Some(Self::Fibonacci)
        } else if request.contains("binary search tree") || request.contains("bst") {
            Some(Self::BinarySearchTree)
        } else if request.contains("hello") {
            Some(Self::HelloWorld)
        } else {
            None
        }
    }

    fn source(&self, language: Language) -> Option<&'static str> {
        match (language, self) {
            (Language::Python, Self::Quicksort) => Some(PYTHON_QUICKSORT),
            (Language::Python, Self::Fibonacci) => Some(PYTHON_FIBONACCI),
            (Language::Python, Self::BinarySearchTree) => Some(PYTHON_BST),
            (Language::Python, Self::HelloWorld) => Some("print(\"Hello, world!\")\n"),
            (Language::Rust, Self::Quicksort) => Some(RUST_QUICKSORT),
            (Language::Rust, Self::Fibonacci) => Some(RUST_FIBONACCI),
            (Language::Rust, Self::BinarySearchTree) => Some(RUST_BST),
            (Language::Rust, Self::HelloWorld) => {
                Some("fn main() {\n    println!(\"Hello, world!\");\n}\n")
            }
            _ => None,
        }
    }
}

/// Generator that answers from a fixed set of programs.
#[derive(Debug, Clone, Copy, Default)]
pub struct CannedGenerator;

impl CannedGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Whether a request/language pair has a built-in program.
    pub fn supports(&self, request: &str, language: Language) -> bool {
        Program::detect(request)
            .and_then(|p| p.source(language))
            .is_some()
    }
}

#[async_trait]
impl Generator for CannedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let program = Program::detect(&request.request).ok_or_else(|| {
            GenerationError::Unsupported {
                language: request.language.to_string(),
                reason: format!("no built-in program for \"{}\"", request.request),
            }
        })?;

        let source = program.source(request.language).ok_or_else(|| {
            GenerationError::Unsupported {
                language: request.language.to_string(),
                reason: "built-in programs exist only for python and rust".to_string(),
            }
        })?;

        debug!("Serving built-in {:?} program for {}", program, request.language);
        Ok(source.to_string())
    }
}

const PYTHON_QUICKSORT: &str = r#"def quicksort(items):
    if len(items) <= 1:
        return list(items)
    pivot = items[len(items) // 2]
    less = [x for x in items if x < pivot]
    equal = [x for x in items if x == pivot]
    greater = [x for x in items if x > pivot]
    return quicksort(less) + equal + quicksort(greater)


def test_quicksort():
    assert quicksort([]) == []
    assert quicksort([1]) == [1]
    assert quicksort([3, 1, 2, 3]) == [1, 2, 3, 3]
    assert quicksort([5, -1, 0]) == [-1, 0, 5]


if __name__ == "__main__":
    test_quicksort()
    data = [38, 27, 43, 3, 9, 82, 10]
    print("Original:", data)
    print("Sorted:  ", quicksort(data))
"#;

const PYTHON_FIBONACCI: &str = r#"from functools import lru_cache


@lru_cache(maxsize=None)
def fibonacci(n):
    if n < 0:
        raise ValueError("n must be non-negative")
    if n < 2:
        return n
    return fibonacci(n - 1) + fibonacci(n - 2)


def test_fibonacci():
    assert [fibonacci(i) for i in range(8)] == [0, 1, 1, 2, 3, 5, 8, 13]
    assert fibonacci(90) == 2880067194370816120
    try:
        fibonacci(-1)
    except ValueError:
        pass
    else:
        raise AssertionError("negative input must fail")


if __name__ == "__main__":
    test_fibonacci()
    for n in (0, 1, 10, 50, 90):
        print(f"fib({n}) = {fibonacci(n)}")
"#;

const PYTHON_BST: &str = r#"class Node:
    def __init__(self, value):
        self.value = value
        self.left = None
        self.right = None


class BinarySearchTree:
    def __init__(self):
        self.root = None

    def insert(self, value):
        if self.root is None:
            self.root = Node(value)
            return True
        node = self.root
        while True:
            if value == node.value:
                return False
            if value < node.value:
                if node.left is None:
                    node.left = Node(value)
                    return True
                node = node.left
            else:
                if node.right is None:
                    node.right = Node(value)
                    return True
                node = node.right

    def contains(self, value):
        node = self.root
        while node is not None:
            if value == node.value:
                return True
            node = node.left if value < node.value else node.right
        return False

    def in_order(self):
        result = []

        def walk(node):
            if node is not None:
                walk(node.left)
                result.append(node.value)
                walk(node.right)

        walk(self.root)
        return result


def test_tree():
    tree = BinarySearchTree()
    for value in [50, 30, 70, 20, 40, 60, 80]:
        assert tree.insert(value)
    assert not tree.insert(40)
    assert tree.in_order() == [20, 30, 40, 50, 60, 70, 80]
    assert tree.contains(60)
    assert not tree.contains(65)


if __name__ == "__main__":
    test_tree()
    tree = BinarySearchTree()
    for value in [50, 30, 70, 20, 40, 60, 80]:
        tree.insert(value)
    print("In-order:", tree.in_order())
    print("Contains 60:", tree.contains(60))
"#;

const RUST_QUICKSORT: &str = r#"fn quicksort<T: PartialOrd + Clone>(items: &[T]) -> Vec<T> {
    if items.len() <= 1 {
        return items.to_vec();
    }
    let pivot = items[items.len() / 2].clone();
    let less: Vec<T> = items.iter().filter(|x| **x < pivot).cloned().collect();
    let equal: Vec<T> = items.iter().filter(|x| **x == pivot).cloned().collect();
    let greater: Vec<T> = items.iter().filter(|x| **x > pivot).cloned().collect();

    let mut sorted = quicksort(&less);
    sorted.extend(equal);
    sorted.extend(quicksort(&greater));
    sorted
}

fn main() {
    let data = vec![38, 27, 43, 3, 9, 82, 10];
    let sorted = quicksort(&data);
    assert!(sorted.windows(2).all(|w| w[0] <= w[1]));
    println!("Original: {:?}", data);
    println!("Sorted:   {:?}", sorted);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_with_duplicates() {
        assert_eq!(quicksort(&[3, 1, 2, 3]), vec![1, 2, 3, 3]);
    }

    #[test]
    fn handles_empty() {
        assert!(quicksort::<i32>(&[]).is_empty());
    }
}
"#;

const RUST_FIBONACCI: &str = r#"use std::collections::HashMap;

fn fibonacci(n: u64, memo: &mut HashMap<u64, u64>) -> u64 {
    if n < 2 {
        return n;
    }
    if let Some(&value) = memo.get(&n) {
        return value;
    }
    let value = fibonacci(n - 1, memo) + fibonacci(n - 2, memo);
    memo.insert(n, value);
    value
}

fn main() {
    let mut memo = HashMap::new();
    for n in [0, 1, 10, 50, 90] {
        println!("fib({}) = {}", n, fibonacci(n, &mut memo));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_values() {
        let mut memo = HashMap::new();
        let values: Vec<u64> = (0..8).map(|n| fibonacci(n, &mut memo)).collect();
        assert_eq!(values, vec![0, 1, 1, 2, 3, 5, 8, 13]);
    }

    #[test]
    fn large_value() {
        assert_eq!(fibonacci(90, &mut HashMap::new()), 2880067194370816120);
    }
}
"#;

const RUST_BST: &str = r#"use std::cmp::Ordering;

struct Node {
    value: i32,
    left: Option<Box<Node>>,
    right: Option<Box<Node>>,
}

#[derive(Default)]
struct BinarySearchTree {
    root: Option<Box<Node>>,
}

impl BinarySearchTree {
    fn insert(&mut self, value: i32) -> bool {
        insert_into(&mut self.root, value)
    }

    fn contains(&self, value: i32) -> bool {
        let mut current = &self.root;
        while let Some(node) = current {
            match value.cmp(&node.value) {
                Ordering::Less => current = &node.left,
                Ordering::Greater => current = &node.right,
                Ordering::Equal => return true,
            }
        }
        false
    }

    fn in_order(&self) -> Vec<i32> {
        let mut out = Vec::new();
        walk(&self.root, &mut out);
        out
    }
}

fn insert_into(slot: &mut Option<Box<Node>>, value: i32) -> bool {
    match slot {
        None => {
            *slot = Some(Box::new(Node {
                value,
                left: None,
                right: None,
            }));
            true
        }
        Some(node) => match value.cmp(&node.value) {
            Ordering::Less => insert_into(&mut node.left, value),
            Ordering::Greater => insert_into(&mut node.right, value),
            Ordering::Equal => false,
        },
    }
}

fn walk(node: &Option<Box<Node>>, out: &mut Vec<i32>) {
    if let Some(node) = node {
        walk(&node.left, out);
        out.push(node.value);
        walk(&node.right, out);
    }
}

fn main() {
    let mut tree = BinarySearchTree::default();
    for value in [50, 30, 70, 20, 40, 60, 80] {
        tree.insert(value);
    }
    println!("In-order: {:?}", tree.in_order());
    println!("Contains 60: {}", tree.contains(60));
    println!("Contains 65: {}", tree.contains(65));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_order_and_rejects_duplicates() {
        let mut tree = BinarySearchTree::default();
        for value in [5, 3, 8, 1, 4] {
            assert!(tree.insert(value));
        }
        assert!(!tree.insert(4));
        assert_eq!(tree.in_order(), vec![1, 3, 4, 5, 8]);
        assert!(tree.contains(8));
        assert!(!tree.contains(7));
    }
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_picks_program_by_keyword() {
        let generator = CannedGenerator::new();

        let code = generator
            .generate(&GenerationRequest::new("write quicksort in Rust", Language::Rust))
            .await
            .unwrap();
        assert!(code.contains("fn quicksort"));

        let code = generator
            .generate(&GenerationRequest::new(
                "implement fibonacci with memoization in Python",
                Language::Python,
            ))
            .await
            .unwrap();
        assert!(code.contains("lru_cache"));

        let code = generator
            .generate(&GenerationRequest::new(
                "create a binary search tree in Python",
                Language::Python,
            ))
            .await
            .unwrap();
        assert!(code.contains("class BinarySearchTree"));
    }

    #[tokio::test]
    async fn test_unknown_request_fails() {
        let err = CannedGenerator::new()
            .generate(&GenerationRequest::new("build a web server", Language::Python))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Unsupported { .. }));
    }

    #[tokio::test]
    async fn test_unsupported_language_fails() {
        let generator = CannedGenerator::new();
        assert!(!generator.supports("hello world", Language::Go));

        let err = generator
            .generate(&GenerationRequest::new("hello world", Language::Go))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Unsupported { ref language, .. } if language == "go"));
    }
}
