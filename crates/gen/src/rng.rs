//! 字符串种子哈希 (xmur3) 与均匀位流 (sfc32)、Box-Muller 高斯采样。
//!
//! 算法与参数是跨实现对齐的线上契约，任何一个常量变动都会
//! 使全部历史序列失效，修改前必须升级序列 version。

/// # Summary
/// xmur3 字符串哈希，把任意种子字符串折叠为 32 位状态，
/// 并按需产出后续的派生种子字。
///
/// # Invariants
/// - 全部运算为 u32 回绕语义，与参考实现逐位一致。
/// - 字符按 Unicode 标量值逐个吸收。
struct Xmur3 {
    h: u32,
}

impl Xmur3 {
    fn new(seed: &str) -> Self {
        let mut h: u32 = 1779033703;
        for ch in seed.chars() {
            h ^= u32::from(ch);
            h = h.wrapping_mul(3432918353);
            h = h.rotate_left(13);
        }
        Self { h }
    }

    /// 产出下一个派生种子字（finalizer 混淆一轮）。
    fn next(&mut self) -> u32 {
        self.h ^= self.h >> 16;
        self.h = self.h.wrapping_mul(2246822507);
        self.h ^= self.h >> 13;
        self.h = self.h.wrapping_mul(3266489909);
        self.h ^= self.h >> 16;
        self.h
    }
}

/// # Summary
/// sfc32 伪随机数发生器，由种子字符串确定性初始化，
/// 产出无界的 `[0, 1)` 均匀序列。
///
/// # Invariants
/// - 同一种子在跨进程、跨实现间产出逐位一致的序列。
/// - 不同种子的序列在实用意义上不相关（无密码学保证）。
/// - 消费顺序可观测：每次 `next_f64` 恰好推进一步。
#[derive(Debug, Clone)]
pub struct SeededRng {
    a: u32,
    b: u32,
    c: u32,
    d: u32,
}

impl SeededRng {
    /// # Summary
    /// 从种子字符串构造发生器。
    ///
    /// # Logic
    /// 用 xmur3 连续产出四个种子字填充 sfc32 的四个状态槽。
    pub fn from_seed(seed: &str) -> Self {
        let mut hasher = Xmur3::new(seed);
        Self {
            a: hasher.next(),
            b: hasher.next(),
            c: hasher.next(),
            d: hasher.next(),
        }
    }

    /// # Summary
    /// 产出下一个 `[0, 1)` 均匀值。
    pub fn next_f64(&mut self) -> f64 {
        let mut t = self.a.wrapping_add(self.b);
        self.a = self.b ^ (self.b >> 9);
        self.b = self.c.wrapping_add(self.c << 3);
        self.c = self.c.rotate_left(21);
        self.d = self.d.wrapping_add(1);
        t = t.wrapping_add(self.d);
        self.c = self.c.wrapping_add(t);
        f64::from(t) / 4294967296.0
    }

    /// # Summary
    /// Box-Muller 变换产出一个标准正态偏差。
    ///
    /// # Logic
    /// 每次调用恰好消费两个均匀值，不缓存第二个偏差——
    /// 缓存会重排消费顺序，影响同一发生器之后的所有抽取。
    /// 均匀值为 0 时以 1e-12 代入，避免 `ln(0)`。
    pub fn next_gaussian(&mut self) -> f64 {
        let mut u1 = self.next_f64();
        if u1 == 0.0 {
            u1 = 1e-12;
        }
        let mut u2 = self.next_f64();
        if u2 == 0.0 {
            u2 = 1e-12;
        }
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }
}
