//! Operation codes.
//!
//! Each entry-point family has its own closed enum. The integer wire values are
//! stable: callers that only have an `i32` decode it with `TryFrom<i32>`, and
//! unknown values fail with [`KernelError::InvalidOpcode`].

use crate::KernelError;

macro_rules! opcode_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $family:literal {
            $($(#[$vmeta:meta])* $variant:ident = $code:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(i32)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $code,)+
        }

        impl $name {
            /// Every opcode of this family in wire order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// Family name used in error messages.
            pub const FAMILY: &'static str = $family;

            /// Variant name.
            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant),)+
                }
            }

            /// Wire value.
            #[inline]
            pub fn code(self) -> i32 {
                self as i32
            }

            pub(crate) fn unsupported(self) -> KernelError {
                KernelError::UnsupportedOpcode {
                    family: $family,
                    op: self.name(),
                }
            }
        }

        impl TryFrom<i32> for $name {
            type Error = KernelError;

            fn try_from(code: i32) -> Result<Self, Self::Error> {
                match code {
                    $($code => Ok($name::$variant),)+
                    _ => Err(KernelError::InvalidOpcode {
                        family: $family,
                        code,
                    }),
                }
            }
        }

        impl From<$name> for i32 {
            fn from(op: $name) -> i32 {
                op as i32
            }
        }
    };
}

opcode_enum! {
    /// In-place unary operations on real buffers, with scalar operand `a`.
    RealUnaryOp, "real unary" {
        /// `x + a`
        Add = 0,
        /// `x * a`
        Mul = 1,
        /// `a`
        Fill = 2,
        Abs = 3,
        /// `x.powf(a)`
        Pow = 4,
        Exp = 5,
        /// Uniform sample in `[0, a)`
        Rnd = 6,
        Log = 7,
        Sqrt = 8,
        /// `x * x`
        Sqr = 9,
        /// `1 / x`
        Inv = 10,
        Ceil = 11,
        Floor = 12,
        Round = 13,
        Sin = 14,
        Cos = 15,
        Tan = 16,
        Asin = 17,
        Acos = 18,
        Atan = 19,
        Sinh = 20,
        Cosh = 21,
        Tanh = 22,
        /// Random permutation of the buffer
        Shuffle = 23,
    }
}

opcode_enum! {
    /// In-place unary operations on interleaved complex buffers.
    ComplexUnaryOp, "complex unary" {
        Add = 0,
        Mul = 1,
        Fill = 2,
        Exp = 3,
        /// Real and imaginary parts uniform in `[0, a.re)` and `[0, a.im)`
        Rnd = 4,
        Inv = 5,
        Sqrt = 6,
        Log = 7,
        Conj = 8,
        Cos = 9,
        Sin = 10,
    }
}

opcode_enum! {
    /// In-place unary operations on integer buffers (wrapping arithmetic).
    IntegerUnaryOp, "integer unary" {
        Add = 0,
        Mul = 1,
        Fill = 2,
        Abs = 3,
        /// Uniform sample in `[0, a)`
        Rnd = 4,
        Shuffle = 5,
    }
}

opcode_enum! {
    /// Binary element-wise operations.
    BinaryOp, "binary" {
        Add = 0,
        Sub = 1,
        Mul = 2,
        Div = 3,
        Max = 4,
        Min = 5,
        /// 1 where equal, else 0
        Eq = 6,
        /// 1 where `lhs > rhs`, else 0
        Gt = 7,
        /// 1 where `lhs < rhs`, else 0
        Lt = 8,
        /// 1 where both non-zero, else 0
        And = 9,
        /// 1 where either non-zero, else 0
        Or = 10,
    }
}

opcode_enum! {
    /// Whole-buffer folds.
    AccumulatorOp, "accumulator" {
        Sum = 0,
        Prod = 1,
        Max = 2,
        Min = 3,
        /// Population variance
        Var = 4,
        /// Entropy `-sum(p ln p)`
        Ent = 5,
    }
}

opcode_enum! {
    /// Running accumulations (whole-buffer scans and along dimensions).
    CumulativeOp, "cumulative" {
        Sum = 0,
        Prod = 1,
    }
}

opcode_enum! {
    /// Reductions along dimensions.
    ReduceOp, "reduce" {
        Sum = 0,
        Prod = 1,
        Max = 2,
        Min = 3,
        Var = 4,
    }
}

opcode_enum! {
    /// Index-producing operations along a dimension.
    IndexOp, "index" {
        Max = 0,
        Min = 1,
        Zero = 2,
        /// Strictly greater than zero
        GZero = 3,
        /// Strictly less than zero
        LZero = 4,
        /// Stable ascending argsort
        Sort = 5,
    }
}

opcode_enum! {
    /// Conversions between real, complex and integer buffers.
    ConvertOp, "convert" {
        /// Real part
        Re = 0,
        /// Imaginary part
        Im = 1,
        /// Modulus
        Abs = 2,
    }
}
