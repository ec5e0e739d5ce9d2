//! Integer arithmetic. Results wrap on overflow.

binary_integer_node!(
    /// `a + b`
    Add,
    "arithmetic.add",
    |ctx, a, b| a.wrapping_add(b)
);

binary_integer_node!(
    /// `a - b`
    Subtract,
    "arithmetic.sub",
    |ctx, a, b| a.wrapping_sub(b)
);

binary_integer_node!(
    /// `a * b`
    Multiply,
    "arithmetic.mul",
    |ctx, a, b| a.wrapping_mul(b)
);

binary_integer_node!(
    /// `a / b`, rounded towards zero.
    Divide,
    "arithmetic.div",
    |ctx, a, b| {
        if b == 0 {
            return Err(ctx.error("Division by zero"));
        }
        a / b
    }
);

binary_integer_node!(
    /// `a % b`
    Modulus,
    "arithmetic.mod",
    |ctx, a, b| {
        if b == 0 {
            return Err(ctx.error("Division by zero"));
        }
        a % b
    }
);
