/// Longest common subsequence of `a` and `b`, byte wise.
///
/// The matched bytes don't have to be contiguous. The table is kept in a single row-major
/// vector of `(a.len() + 1) * (b.len() + 1)` lengths.
pub fn lcs(a: &[u8], b: &[u8]) -> Vec<u8> {
    let width = b.len() + 1;
    let mut lengths = vec![0usize; (a.len() + 1) * width];

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            lengths[i * width + j] = if a[i - 1] == b[j - 1] {
                lengths[(i - 1) * width + j - 1] + 1
            } else {
                lengths[(i - 1) * width + j].max(lengths[i * width + j - 1])
            };
        }
    }

    // Walk back from the bottom right corner.
    let mut result = Vec::with_capacity(lengths[a.len() * width + b.len()]);
    let (mut i, mut j) = (a.len(), b.len());
    while i > 0 && j > 0 {
        if a[i - 1] == b[j - 1] {
            result.push(a[i - 1]);
            i -= 1;
            j -= 1;
        } else if lengths[(i - 1) * width + j] > lengths[i * width + j - 1] {
            i -= 1;
        } else {
            j -= 1;
        }
    }

    result.reverse();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_subsequences() {
        assert_eq!(lcs(b"", b""), b"");
        assert_eq!(lcs(b"", b"abcd"), b"");
        assert_eq!(lcs(b"abcd", b"e"), b"");
        assert_eq!(lcs(b"abcdefghi", b"acegi"), b"acegi");
        assert_eq!(lcs(b"ohmytext", b"mynewtext"), b"mytext");
        assert_eq!(lcs(b"hello world", b"world hello"), b"world");
        assert_eq!(lcs(b"world hello", b"hello world"), b"hello");
    }
}
