/// Every subset of `items`, largest subsets first, ending with the empty set.
///
/// Subsets of equal size come out in lexicographic index order, so the
/// caller's ordering of `items` decides which fragments are tried first.
pub struct Combinations<'a, T> {
    items: &'a [T],
    indices: Vec<usize>,
    done: bool,
}

impl<'a, T: Clone> Combinations<'a, T> {
    pub fn new(items: &'a [T]) -> Self {
        Self {
            items,
            indices: (0..items.len()).collect(),
            done: false,
        }
    }

    fn advance(&mut self) {
        let n = self.items.len();
        let k = self.indices.len();

        let mut i = k;
        while i > 0 {
            i -= 1;
            if self.indices[i] < n - k + i {
                self.indices[i] += 1;
                for j in i + 1..k {
                    self.indices[j] = self.indices[j - 1] + 1;
                }
                return;
            }
        }

        if k == 0 {
            self.done = true;
        } else {
            self.indices = (0..k - 1).collect();
        }
    }
}

impl<'a, T: Clone> Iterator for Combinations<'a, T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let combination = self.indices.iter().map(|&i| self.items[i].clone()).collect();
        self.advance();
        Some(combination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order() {
        let all: Vec<Vec<char>> = Combinations::new(&['a', 'b', 'c']).collect();
        assert_eq!(
            all,
            vec![
                vec!['a', 'b', 'c'],
                vec!['a', 'b'],
                vec!['a', 'c'],
                vec!['b', 'c'],
                vec!['a'],
                vec!['b'],
                vec!['c'],
                vec![],
            ]
        );
    }

    #[test]
    fn test_empty_input() {
        let all: Vec<Vec<u8>> = Combinations::new(&[]).collect();
        assert_eq!(all, vec![Vec::<u8>::new()]);
    }
}
